//! Configuration: backend selection from the environment, game settings from TOML.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::VerbotenError;

/// Which flavor of the AI backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Public API authenticated with an API key.
    GeminiApi,
    /// Managed cloud platform, addressed by project and location.
    VertexAi,
}

/// Credentials and endpoints for the AI backend.
///
/// Built once at startup and passed by reference to whatever needs it.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// API key (API mode).
    pub api_key: Option<String>,
    /// OAuth bearer token (managed platform mode).
    pub access_token: Option<String>,
    pub project: Option<String>,
    pub location: Option<String>,
    /// OpenAI-compatible base URL for request/response calls.
    pub api_base: String,
    /// Model used by the turn-based judge and guesser.
    pub model: String,
    /// Model used by live audio sessions.
    pub live_model: String,
}

const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
const LIVE_MODEL_API: &str = "gemini-2.5-flash-native-audio-preview-09-2025";
const LIVE_MODEL_VERTEX: &str = "gemini-live-2.5-flash-preview-native-audio-09-2025";

impl BackendConfig {
    /// Read the backend configuration from process environment variables.
    pub fn from_env() -> Result<Self, VerbotenError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the backend configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, VerbotenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let use_vertex = get("GOOGLE_GENAI_USE_VERTEXAI")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        if use_vertex {
            let project = get("GOOGLE_CLOUD_PROJECT").ok_or_else(|| {
                VerbotenError::ConfigError("GOOGLE_CLOUD_PROJECT must be set for Vertex AI".to_string())
            })?;
            let location = get("GOOGLE_CLOUD_LOCATION").unwrap_or_else(|| "us-central1".to_string());
            let access_token = get("GOOGLE_ACCESS_TOKEN").ok_or_else(|| {
                VerbotenError::ConfigError("GOOGLE_ACCESS_TOKEN must be set for Vertex AI".to_string())
            })?;
            let api_base = get("VERBOTEN_API_BASE").unwrap_or_else(|| {
                format!(
                    "https://{location}-aiplatform.googleapis.com/v1beta1/projects/{project}/locations/{location}/endpoints/openapi"
                )
            });

            Ok(Self {
                kind: BackendKind::VertexAi,
                api_key: None,
                access_token: Some(access_token),
                project: Some(project),
                location: Some(location),
                api_base,
                model: get("VERBOTEN_MODEL").unwrap_or_else(|| format!("google/{}", DEFAULT_MODEL)),
                live_model: get("VERBOTEN_LIVE_MODEL").unwrap_or_else(|| LIVE_MODEL_VERTEX.to_string()),
            })
        } else {
            let api_key = get("GOOGLE_API_KEY")
                .or_else(|| get("GEMINI_API_KEY"))
                .ok_or_else(|| {
                    VerbotenError::ConfigError(
                        "GOOGLE_API_KEY (or GEMINI_API_KEY) must be set".to_string(),
                    )
                })?;

            Ok(Self {
                kind: BackendKind::GeminiApi,
                api_key: Some(api_key),
                access_token: None,
                project: None,
                location: None,
                api_base: get("VERBOTEN_API_BASE").unwrap_or_else(|| {
                    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
                }),
                model: get("VERBOTEN_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                live_model: get("VERBOTEN_LIVE_MODEL").unwrap_or_else(|| LIVE_MODEL_API.to_string()),
            })
        }
    }

    /// Secret sent as the bearer credential on request/response calls.
    pub fn bearer(&self) -> &str {
        self.api_key
            .as_deref()
            .or(self.access_token.as_deref())
            .unwrap_or_default()
    }

    /// WebSocket URL of the live bidirectional endpoint.
    pub fn live_endpoint(&self) -> String {
        match self.kind {
            BackendKind::GeminiApi => format!(
                "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent?key={}",
                self.api_key.as_deref().unwrap_or_default()
            ),
            BackendKind::VertexAi => format!(
                "wss://{}-aiplatform.googleapis.com/ws/google.cloud.aiplatform.v1beta1.LlmBidiService/BidiGenerateContent",
                self.location.as_deref().unwrap_or("us-central1")
            ),
        }
    }

    /// Model identifier as the live setup message expects it.
    pub fn live_model_path(&self) -> String {
        match self.kind {
            BackendKind::GeminiApi => format!("models/{}", self.live_model),
            BackendKind::VertexAi => format!(
                "projects/{}/locations/{}/publishers/google/models/{}",
                self.project.as_deref().unwrap_or_default(),
                self.location.as_deref().unwrap_or("us-central1"),
                self.live_model
            ),
        }
    }
}

/// Root of the optional TOML settings file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Settings shared by both game variants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Path of the word catalog JSON file.
    pub catalog_path: PathBuf,
    /// Guesses allowed per turn-based game.
    pub guesses: u32,
    /// Prebuilt voice of the live guesser.
    pub voice_name: String,
    /// Per-request timeout for turn-based model calls, in seconds.
    pub request_timeout_secs: u64,
    /// Attempts per turn-based model call before giving up.
    pub max_retries: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("assets/words.json"),
            guesses: 3,
            voice_name: "Puck".to_string(),
            request_timeout_secs: 60,
            max_retries: 3,
        }
    }
}

/// Settings of the web server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory holding the page template and static files.
    pub assets_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            assets_dir: PathBuf::from("assets"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VerbotenError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| VerbotenError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_str(&content)
    }

    /// Load configuration from string content.
    pub fn from_str(content: &str) -> Result<Self, VerbotenError> {
        toml::from_str(content)
            .map_err(|e| VerbotenError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, VerbotenError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(default_config())
        }
    }
}

/// Configuration used when no settings file is present.
pub fn default_config() -> Config {
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_api_key_backend() {
        let config = BackendConfig::from_lookup(lookup(&[("GOOGLE_API_KEY", "secret")])).unwrap();

        assert_eq!(config.kind, BackendKind::GeminiApi);
        assert_eq!(config.bearer(), "secret");
        assert_eq!(config.model, "gemini-2.5-flash-lite");
        assert_eq!(
            config.live_model_path(),
            "models/gemini-2.5-flash-native-audio-preview-09-2025"
        );
        assert!(config.live_endpoint().ends_with("?key=secret"));
    }

    #[test]
    fn test_vertex_backend() {
        let config = BackendConfig::from_lookup(lookup(&[
            ("GOOGLE_GENAI_USE_VERTEXAI", "true"),
            ("GOOGLE_CLOUD_PROJECT", "my-project"),
            ("GOOGLE_CLOUD_LOCATION", "europe-west1"),
            ("GOOGLE_ACCESS_TOKEN", "token"),
        ]))
        .unwrap();

        assert_eq!(config.kind, BackendKind::VertexAi);
        assert_eq!(config.bearer(), "token");
        assert!(config.live_endpoint().starts_with("wss://europe-west1-aiplatform"));
        assert_eq!(
            config.live_model_path(),
            "projects/my-project/locations/europe-west1/publishers/google/models/gemini-live-2.5-flash-preview-native-audio-09-2025"
        );
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let result = BackendConfig::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(VerbotenError::ConfigError(_))));

        let result = BackendConfig::from_lookup(lookup(&[("GOOGLE_GENAI_USE_VERTEXAI", "1")]));
        assert!(matches!(result, Err(VerbotenError::ConfigError(_))));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_str("[game]\nguesses = 5\n\n[server]\nport = 9000\n").unwrap();
        assert_eq!(config.game.guesses, 5);
        assert_eq!(config.game.voice_name, "Puck");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.assets_dir, PathBuf::from("assets"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_str("[game\nguesses ="),
            Err(VerbotenError::ConfigError(_))
        ));
    }
}

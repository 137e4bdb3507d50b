//! Error types for the game server and the turn-based pipeline.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, VerbotenError>;

#[derive(Error, Debug)]
pub enum VerbotenError {
    #[error("OpenAI-compatible API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Word catalog error: {0}")]
    CatalogError(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Malformed realtime input frame: {0}")]
    MalformedFrame(String),

    #[error("Model response does not match the expected schema: {0}")]
    ResponseSchema(String),

    #[error("The game is already over")]
    GameOver,

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Live session error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for VerbotenError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        VerbotenError::Transport(err.to_string())
    }
}

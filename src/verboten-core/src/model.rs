//! Request/response access to the language model.
//!
//! The turn-based judge and guesser only see the [`ChatModel`] trait, so a
//! scripted model can stand in for the backend in tests.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ResponseFormat,
    ResponseFormatJsonSchema,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::config::{BackendConfig, GameConfig};
use crate::error::{Result, VerbotenError};

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a conversation sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A JSON schema the model's answer must follow.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: String,
    pub description: Option<String>,
    pub schema: serde_json::Value,
}

/// Text completion seam over the AI backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete a conversation with free-form text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Complete a conversation, constraining the answer to `schema`.
    /// Returns the raw JSON text of the answer.
    async fn complete_json(&self, messages: &[ChatMessage], schema: &ResponseSchema) -> Result<String>;
}

/// [`ChatModel`] backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    max_retries: u32,
}

impl OpenAiChatModel {
    /// Build the client once; it is shared by every game of the process.
    pub fn new(backend: &BackendConfig, game: &GameConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(game.request_timeout_secs))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                VerbotenError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        let config = OpenAIConfig::new()
            .with_api_key(backend.bearer())
            .with_api_base(&backend.api_base);

        Ok(Self {
            client: Client::with_config(config).with_http_client(http_client),
            model: backend.model.clone(),
            max_retries: game.max_retries.max(1),
        })
    }

    /// Send a request, retrying with exponential backoff.
    async fn send(&self, request: CreateChatCompletionRequest) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // 1s, 2s, 4s...
                tokio::time::sleep(Duration::from_secs(1 << (attempt - 1).min(5))).await;
            }

            match self.client.chat().create(request.clone()).await {
                Ok(response) => {
                    let content = response
                        .choices
                        .first()
                        .and_then(|c| c.message.content.clone())
                        .unwrap_or_default();
                    if content.trim().is_empty() {
                        return Err(VerbotenError::EmptyResponse);
                    }
                    return Ok(content);
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "model request failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.map(VerbotenError::from).unwrap_or_else(|| {
            VerbotenError::ConfigError("Unknown API error after retries".to_string())
        }))
    }
}

#[allow(deprecated)]
fn to_request_messages(messages: &[ChatMessage]) -> Vec<ChatCompletionRequestMessage> {
    messages
        .iter()
        .map(|m| match m.role {
            Role::System => ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: m.content.clone().into(),
                name: None,
            }),
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: m.content.clone().into(),
                name: None,
            }),
            Role::Assistant => {
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(m.content.clone().into()),
                    name: None,
                    tool_calls: None,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
        })
        .collect()
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(to_request_messages(messages))
            .build()?;

        self.send(request).await
    }

    async fn complete_json(&self, messages: &[ChatMessage], schema: &ResponseSchema) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(to_request_messages(messages))
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: schema.description.clone(),
                    name: schema.name.clone(),
                    schema: Some(schema.schema.clone()),
                    strict: Some(false),
                },
            })
            .build()?;

        self.send(request).await
    }
}

/// Strip reasoning tags and markdown emphasis from a model reply.
///
/// Removes patterns like `<thinking>...</thinking>` along with their content.
pub fn sanitize_response(response: &str) -> String {
    let tags_to_strip = ["thinking", "think", "reflection", "reasoning", "thought", "analysis"];

    let mut result = response.to_string();

    for tag in &tags_to_strip {
        let pattern = format!(r"(?is)<{tag}[^>]*>.*?</{tag}>", tag = tag);
        if let Ok(re) = regex::Regex::new(&pattern) {
            result = re.replace_all(&result, "").to_string();
        }
    }

    if let Ok(orphan_re) = regex::Regex::new(r"</?[\w]+[^>]*>") {
        result = orphan_re.replace_all(&result, "").to_string();
    }

    result = result.replace('*', "");

    if let Ok(ws_re) = regex::Regex::new(r"\s+") {
        result = ws_re.replace_all(&result, " ").to_string();
    }

    result.trim().to_string()
}

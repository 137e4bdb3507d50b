//! Live session transport: one bidirectional connection to the AI backend.
//!
//! A session is split in two halves so that one task can write while
//! another reads. Writes to a session always go through its single sink.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};

use crate::config::{BackendConfig, BackendKind};
use crate::error::{Result, VerbotenError};
use crate::live::protocol::{LiveSessionConfig, RealtimeInput, ServerEvent};

/// Write half of a live session.
#[async_trait]
pub trait SessionSink: Send {
    async fn send_realtime_input(&mut self, frame: &RealtimeInput) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Read half of a live session.
#[async_trait]
pub trait SessionStream: Send {
    /// Next server event, or `None` once the backend disconnected.
    async fn receive(&mut self) -> Result<Option<ServerEvent>>;
}

/// An open live session.
pub struct LiveSession {
    pub sink: Box<dyn SessionSink>,
    pub stream: Box<dyn SessionStream>,
}

/// Opens live sessions.
#[async_trait]
pub trait LiveConnector: Send + Sync {
    async fn connect(&self, config: &LiveSessionConfig) -> Result<LiveSession>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to the Gemini Live bidirectional streaming endpoint.
pub struct GeminiLiveConnector {
    backend: BackendConfig,
}

impl GeminiLiveConnector {
    pub fn new(backend: BackendConfig) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl LiveConnector for GeminiLiveConnector {
    async fn connect(&self, config: &LiveSessionConfig) -> Result<LiveSession> {
        let mut request = self.backend.live_endpoint().into_client_request()?;
        if self.backend.kind == BackendKind::VertexAi {
            let bearer = format!("Bearer {}", self.backend.bearer());
            let value = HeaderValue::from_str(&bearer)
                .map_err(|e| VerbotenError::ConfigError(format!("Invalid access token: {}", e)))?;
            request.headers_mut().insert("Authorization", value);
        }

        let (ws, _response) = connect_async(request).await?;
        let (mut sink, mut stream) = ws.split();

        let setup = config.setup_message(&self.backend.live_model_path());
        sink.send(Message::Text(setup.to_string())).await?;

        // The backend acknowledges the setup before accepting input.
        loop {
            match next_event(&mut stream).await? {
                Some(event) if event.is_setup_complete() => break,
                Some(_) => continue,
                None => {
                    return Err(VerbotenError::Transport(
                        "connection closed before setup completed".to_string(),
                    ));
                }
            }
        }
        info!(model = %self.backend.live_model, "live session established");

        Ok(LiveSession {
            sink: Box::new(GeminiSink { sink }),
            stream: Box::new(GeminiStream { stream }),
        })
    }
}

struct GeminiSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl SessionSink for GeminiSink {
    async fn send_realtime_input(&mut self, frame: &RealtimeInput) -> Result<()> {
        self.sink.send(Message::Text(frame.to_client_message()?)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.close().await?;
        Ok(())
    }
}

struct GeminiStream {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl SessionStream for GeminiStream {
    async fn receive(&mut self) -> Result<Option<ServerEvent>> {
        next_event(&mut self.stream).await
    }
}

/// Read until the next JSON event, skipping control frames.
async fn next_event(stream: &mut SplitStream<WsStream>) -> Result<Option<ServerEvent>> {
    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => return ServerEvent::from_json(&text).map(Some),
            // Server events may arrive as binary frames holding JSON.
            Message::Binary(bytes) => {
                let value = serde_json::from_slice(&bytes)?;
                return ServerEvent::from_value(value).map(Some);
            }
            Message::Close(frame) => {
                debug!(?frame, "live session closed by backend");
                return Ok(None);
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        }
    }
    Ok(None)
}

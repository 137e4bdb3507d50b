//! Browser WebSocket as a relay client transport.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};

use verboten_core::live::{ClientSink, ClientSource, ClientTransport};
use verboten_core::{Result, VerbotenError};

/// Split an upgraded socket into the relay's two client halves.
pub fn client_transport(socket: WebSocket) -> ClientTransport {
    let (sink, stream) = socket.split();
    ClientTransport::new(WsSource { stream }, WsSink { sink })
}

struct WsSource {
    stream: SplitStream<WebSocket>,
}

#[async_trait]
impl ClientSource for WsSource {
    async fn recv(&mut self) -> Result<Option<String>> {
        while let Some(message) = self.stream.next().await {
            let message = message.map_err(|e| VerbotenError::Transport(e.to_string()))?;
            match message {
                Message::Text(text) => return Ok(Some(text)),
                // Binary frames are still expected to hold JSON; a bad one is malformed input.
                Message::Binary(bytes) => return Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) => continue,
            }
        }
        Ok(None)
    }
}

struct WsSink {
    sink: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl ClientSink for WsSink {
    async fn send(&mut self, text: String) -> Result<()> {
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(|e| VerbotenError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.sink
            .close()
            .await
            .map_err(|e| VerbotenError::Transport(e.to_string()))
    }
}

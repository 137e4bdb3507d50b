//! Client transport: the player's browser connection, as seen by the relay.

use async_trait::async_trait;

use crate::error::Result;

/// Read half of the client connection.
#[async_trait]
pub trait ClientSource: Send {
    /// Next text message from the player, or `None` once they disconnected.
    async fn recv(&mut self) -> Result<Option<String>>;
}

/// Write half of the client connection.
#[async_trait]
pub trait ClientSink: Send {
    async fn send(&mut self, text: String) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Both halves of one player connection.
pub struct ClientTransport {
    pub source: Box<dyn ClientSource>,
    pub sink: Box<dyn ClientSink>,
}

impl ClientTransport {
    pub fn new(source: impl ClientSource + 'static, sink: impl ClientSink + 'static) -> Self {
        Self {
            source: Box::new(source),
            sink: Box::new(sink),
        }
    }
}

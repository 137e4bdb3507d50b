//! Live (streaming audio) games: wire types, transports, and the relay.

pub mod client;
pub mod protocol;
pub mod relay;
pub mod session;

pub use client::{ClientSink, ClientSource, ClientTransport};
pub use protocol::{LiveSessionConfig, Notice, RealtimeInput, ServerEvent};
pub use relay::{GameId, LiveGame, RelayOutcome};
pub use session::{GeminiLiveConnector, LiveConnector, LiveSession, SessionSink, SessionStream};

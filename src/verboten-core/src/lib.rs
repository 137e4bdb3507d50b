//! Verboten Core Library
//!
//! Word catalog, turn-based judging and guessing, and the live relay that
//! streams a player's voice to an AI guesser and an AI judge at once.

pub mod catalog;
pub mod config;
pub mod error;
pub mod game;
pub mod guesser;
pub mod judge;
pub mod language;
pub mod live;
pub mod model;
pub mod normalize;

pub use catalog::{ForbiddenWord, WordCatalog};
pub use config::{BackendConfig, BackendKind, Config, default_config};
pub use error::{Result, VerbotenError};
pub use game::{GameEvent, TurnGame, TurnOutcome};
pub use judge::{Judge, Verdict};
pub use language::Language;
pub use model::{ChatModel, OpenAiChatModel};
pub use normalize::{guess_matches, normalize};

//! The turn-based AI guesser: one chat conversation per game.

use std::sync::Arc;

use crate::error::Result;
use crate::language::Language;
use crate::model::{ChatMessage, ChatModel, sanitize_response};

pub struct Guesser {
    model: Arc<dyn ChatModel>,
    history: Vec<ChatMessage>,
}

impl Guesser {
    pub fn new(model: Arc<dyn ChatModel>, language: Language) -> Self {
        Self {
            model,
            history: vec![ChatMessage::system(language.guesser_instructions())],
        }
    }

    /// Send one description and return the guess.
    ///
    /// On failure the description is dropped from the history, so the turn
    /// can be replayed.
    pub async fn guess(&mut self, description: &str) -> Result<String> {
        self.history.push(ChatMessage::user(description));

        match self.model.complete(&self.history).await {
            Ok(reply) => {
                let guess = sanitize_response(&reply);
                self.history.push(ChatMessage::assistant(guess.clone()));
                Ok(guess)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }

    /// Drop the last description/guess exchange.
    pub fn forget_last_turn(&mut self) {
        if self.history.len() >= 3 {
            self.history.truncate(self.history.len() - 2);
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }
}

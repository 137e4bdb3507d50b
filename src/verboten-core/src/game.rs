//! Turn-based game flow.
//!
//! Each description is judged and guessed concurrently. A confirmed loss
//! beats a winning guess made in the same turn.

use std::sync::Arc;
use tracing::info;

use crate::catalog::ForbiddenWord;
use crate::error::{Result, VerbotenError};
use crate::guesser::Guesser;
use crate::judge::{Judge, Verdict};
use crate::language::Language;
use crate::model::ChatModel;
use crate::normalize::guess_matches;

/// Result of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The description used a proscribed word.
    Lost { verdict: Verdict, exact: bool },
    /// The guesser found the secret word.
    Won { guess: String },
    /// Wrong guess, the game goes on.
    Missed { guess: String, remaining: u32 },
    /// Wrong guess and no guesses left.
    OutOfGuesses { guess: String, word: String },
}

impl TurnOutcome {
    pub fn is_final(&self) -> bool {
        !matches!(self, TurnOutcome::Missed { .. })
    }
}

/// Callback for game events.
pub type GameCallback = Box<dyn Fn(GameEvent) + Send + Sync>;

/// Events emitted during a game.
#[derive(Debug, Clone)]
pub enum GameEvent {
    /// A turn is starting.
    TurnStart { turn: u32, remaining: u32 },
    /// The guesser answered.
    Guess { text: String },
    /// A turn finished.
    TurnEnd(TurnOutcome),
}

/// One turn-based game around a single catalog entry.
pub struct TurnGame {
    entry: ForbiddenWord,
    judge: Judge,
    guesser: Guesser,
    remaining: u32,
    turns: u32,
    finished: bool,
    callback: Option<GameCallback>,
}

impl TurnGame {
    pub fn new(model: Arc<dyn ChatModel>, entry: ForbiddenWord, language: Language, guesses: u32) -> Self {
        Self {
            judge: Judge::new(Arc::clone(&model), entry.clone(), language),
            guesser: Guesser::new(model, language),
            entry,
            remaining: guesses.max(1),
            turns: 0,
            finished: false,
            callback: None,
        }
    }

    /// Set a callback for game events.
    pub fn with_callback(mut self, callback: GameCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn entry(&self) -> &ForbiddenWord {
        &self.entry
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Play one description.
    ///
    /// A backend or schema error aborts the turn without consuming a guess.
    pub async fn play_turn(&mut self, description: &str) -> Result<TurnOutcome> {
        if self.finished {
            return Err(VerbotenError::GameOver);
        }

        self.emit_event(GameEvent::TurnStart {
            turn: self.turns + 1,
            remaining: self.remaining,
        });

        let (verdict, guess) = tokio::join!(
            self.judge.judge(description),
            self.guesser.guess(description),
        );

        let verdict = match verdict {
            Ok(verdict) => verdict,
            Err(e) => {
                if guess.is_ok() {
                    self.guesser.forget_last_turn();
                }
                return Err(e);
            }
        };

        let outcome = if verdict.lost {
            self.turns += 1;
            let exact = verdict.is_exact();
            TurnOutcome::Lost { verdict, exact }
        } else {
            let guess = guess?;
            self.turns += 1;
            self.emit_event(GameEvent::Guess { text: guess.clone() });

            if guess_matches(&guess, &self.entry.word) {
                TurnOutcome::Won { guess }
            } else {
                self.remaining -= 1;
                if self.remaining == 0 {
                    TurnOutcome::OutOfGuesses {
                        guess,
                        word: self.entry.word.clone(),
                    }
                } else {
                    TurnOutcome::Missed {
                        guess,
                        remaining: self.remaining,
                    }
                }
            }
        };

        if outcome.is_final() {
            self.finished = true;
            info!(word = %self.entry.word, turns = self.turns, outcome = ?outcome, "game over");
        }

        self.emit_event(GameEvent::TurnEnd(outcome.clone()));
        Ok(outcome)
    }

    /// Emit an event if a callback is registered.
    fn emit_event(&self, event: GameEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}

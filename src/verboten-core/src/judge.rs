//! Forbidden-word arbitration for the turn-based game.
//!
//! A structured judgement flags suspicious utterances; a flagged fragment
//! only loses the game once a same-root or translation check confirms it.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::ForbiddenWord;
use crate::error::{Result, VerbotenError};
use crate::language::Language;
use crate::model::{ChatMessage, ChatModel, ResponseSchema};
use crate::normalize::normalize;

/// Outcome of judging one utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub lost: bool,
    /// Part of the utterance that broke the rule.
    pub fragment: String,
    /// Proscribed word the fragment matched.
    pub forbidden_word: String,
}

impl Verdict {
    /// No rule was broken.
    pub fn clean() -> Self {
        Self::default()
    }

    /// Whether the fragment is the proscribed word itself rather than a variant of it.
    pub fn is_exact(&self) -> bool {
        normalize(self.fragment.trim()) == normalize(self.forbidden_word.trim())
    }
}

/// Answer of the two confirmation questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub same_root: bool,
    pub translation: bool,
}

impl Confirmation {
    pub fn confirmed(&self) -> bool {
        self.same_root || self.translation
    }
}

/// Wire shape of the structured judgement.
#[derive(Debug, Deserialize)]
struct Judgement {
    lost: bool,
    #[serde(rename = "forbiddenWord", default)]
    forbidden_word: String,
    #[serde(default)]
    fragment: String,
}

/// Judges utterances against one catalog entry.
pub struct Judge {
    model: Arc<dyn ChatModel>,
    entry: ForbiddenWord,
    language: Language,
}

impl Judge {
    pub fn new(model: Arc<dyn ChatModel>, entry: ForbiddenWord, language: Language) -> Self {
        Self {
            model,
            entry,
            language,
        }
    }

    /// Decide whether `utterance` loses the game.
    pub async fn judge(&self, utterance: &str) -> Result<Verdict> {
        let messages = [
            ChatMessage::system(judge_instructions(&self.entry)),
            ChatMessage::user(utterance),
        ];
        let raw = self.model.complete_json(&messages, &judgement_schema()).await?;
        let judgement = parse_judgement(&raw)?;

        if !judgement.lost {
            return Ok(Verdict::clean());
        }

        debug!(
            fragment = %judgement.fragment,
            forbidden = %judgement.forbidden_word,
            "judgement flagged a fragment, confirming"
        );

        let confirmation = self
            .confirm(&judgement.fragment, &judgement.forbidden_word)
            .await?;

        if !confirmation.confirmed() {
            info!(
                "Judge says: the words '{}' and '{}' looked suspiciously similar, but not for sure",
                judgement.fragment, judgement.forbidden_word
            );
            return Ok(Verdict::clean());
        }

        if confirmation.same_root {
            info!(
                "Judge says: the words '{}' and '{}' have the same root",
                judgement.fragment, judgement.forbidden_word
            );
        }
        if confirmation.translation {
            info!(
                "Judge says: '{}' is a translation of the proscribed word '{}'",
                judgement.fragment, judgement.forbidden_word
            );
        }

        Ok(Verdict {
            lost: true,
            fragment: judgement.fragment,
            forbidden_word: judgement.forbidden_word,
        })
    }

    /// Ask the same-root and translation questions concurrently.
    ///
    /// Both requests always run to completion. A positive answer from one
    /// check stands even if the other failed; otherwise the first error wins.
    pub async fn confirm(&self, fragment: &str, forbidden_word: &str) -> Result<Confirmation> {
        let (same_root, translation) = tokio::join!(
            self.have_same_root(fragment, forbidden_word),
            self.is_translation(fragment, forbidden_word),
        );

        match (same_root, translation) {
            (Ok(same_root), Ok(translation)) => Ok(Confirmation {
                same_root,
                translation,
            }),
            (Ok(true), Err(e)) => {
                warn!(error = %e, "translation check failed, same-root check confirmed");
                Ok(Confirmation {
                    same_root: true,
                    translation: false,
                })
            }
            (Err(e), Ok(true)) => {
                warn!(error = %e, "same-root check failed, translation check confirmed");
                Ok(Confirmation {
                    same_root: false,
                    translation: true,
                })
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    }

    async fn have_same_root(&self, word1: &str, word2: &str) -> Result<bool> {
        let prompt = format!(
            "Can we say that the words '{}' and '{}' share the same root?\nAnswer just Yes or No, and nothing else.",
            word1, word2
        );
        self.ask_yes_no(prompt).await
    }

    async fn is_translation(&self, word1: &str, word2: &str) -> Result<bool> {
        let prompt = format!(
            "Can we say that the word '{}' is a translation of the {} word '{}' in another language?\nAnswer just Yes or No, and nothing else.",
            word1,
            self.language.name(),
            word2
        );
        self.ask_yes_no(prompt).await
    }

    async fn ask_yes_no(&self, prompt: String) -> Result<bool> {
        let answer = self.model.complete(&[ChatMessage::user(prompt)]).await?;
        Ok(is_yes(&answer))
    }
}

/// Strict yes/no reading: only a bare "yes" counts.
fn is_yes(answer: &str) -> bool {
    normalize(answer).trim_matches(|c: char| !c.is_alphanumeric()) == "yes"
}

fn parse_judgement(raw: &str) -> Result<Judgement> {
    let trimmed = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str(trimmed)
        .map_err(|e| VerbotenError::ResponseSchema(format!("failed to parse AI response: {}", e)))
}

/// Schema of the structured judgement: `lost` is the only required field.
pub fn judgement_schema() -> ResponseSchema {
    ResponseSchema {
        name: "judgement".to_string(),
        description: Some("Whether the description used a proscribed word.".to_string()),
        schema: json!({
            "type": "object",
            "properties": {
                "lost": {
                    "type": "boolean",
                    "description": "Indicates if the user has lost the game."
                },
                "forbiddenWord": {
                    "type": "string",
                    "description": "The word that triggered the loss condition."
                },
                "fragment": {
                    "type": "string",
                    "description": "The text fragment analyzed."
                }
            },
            "required": ["lost"]
        }),
    }
}

/// System instruction of the turn-based judge for `entry`.
pub fn judge_instructions(entry: &ForbiddenWord) -> String {
    JUDGE_TEMPLATE.replace("{proscribed}", &entry.all_proscribed().join(", "))
}

/// System instruction of the live judge session for a client-supplied list.
pub fn live_judge_instructions(forbidden: &[String]) -> String {
    LIVE_JUDGE_TEMPLATE.replace("{proscribed}", &forbidden.join(", "))
}

const JUDGE_TEMPLATE: &str = r#"You are the judge in the Proscribed Words game.
The human player will say a description.

If the prompt contains any of the proscribed words, or an inflection of a forbidden
word, or a proscribed word translated in another language, then the game is lost.

The proscribed words are:
{proscribed}

In the field "forbiddenWord", provide exactly one of the original proscribed words.

In the field "fragment", provide the part of the prompt that violated the rule.

The description must be rejected as using a proscribed word only if it actually contains
an inflection, or misspelling, or translation of a proscribed word.

Synonyms of proscribed words must not trigger a lost game.

E.g. "ficelle" does not match the proscribed word "Corde": the two words have a similar
meaning, but "ficelle" is not an inflection of "corde", so the game is not lost.

E.g. "orange" does not match the proscribed word "Agrume": the two words have a similar
meaning, but "orange" is not an inflection of "Agrume", so the game is not lost.

E.g. "tronc" does not match the proscribed word "Arbre": the two words have related
meaning, but "tronc" is not an inflection of "Arbre", so the game is not lost.

E.g. "poussent" matches the proscribed word "Pousser": "poussent" is a conjugation of the
verb "Pousser", thus an inflection of "Pousser", and the game is lost."#;

const LIVE_JUDGE_TEMPLATE: &str = r#"You're a judge listening to a human player of Proscribed Words, who is not allowed to
say any of the words from the proscribed list. If the human player says any of them,
or an inflection, a misspelling, or a translation in another language of one of them,
then pronounce only the phrase from the human that violated the rule.
Words that merely have a similar meaning are allowed: do not flag synonyms.
If no rule is violated, stay completely silent.

The proscribed words are: {proscribed}"#;

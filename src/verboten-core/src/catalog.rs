//! Word catalog: the secret words and their proscribed variants, per language.
//!
//! Loaded once at startup and shared read-only between games.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, VerbotenError};
use crate::language::Language;

/// One secret word and the words that may not be said while describing it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForbiddenWord {
    /// The word to make the guesser say.
    pub word: String,
    /// Declared synonyms and variants, also off limits.
    pub forbidden: Vec<String>,
    /// Language the entry was listed under.
    #[serde(skip)]
    pub language: Option<Language>,
}

impl ForbiddenWord {
    pub fn new(word: impl Into<String>, forbidden: Vec<String>) -> Self {
        Self {
            word: word.into(),
            forbidden,
            language: None,
        }
    }

    /// The secret word followed by all of its variants.
    pub fn all_proscribed(&self) -> Vec<&str> {
        std::iter::once(self.word.as_str())
            .chain(self.forbidden.iter().map(String::as_str))
            .collect()
    }
}

/// Language-partitioned word lists.
#[derive(Debug, Clone, Default)]
pub struct WordCatalog {
    words: HashMap<Language, Vec<ForbiddenWord>>,
}

impl WordCatalog {
    /// Load the catalog from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            VerbotenError::CatalogError(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parse the catalog from its JSON text: an object keyed by language code.
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: HashMap<String, Vec<ForbiddenWord>> = serde_json::from_str(content)
            .map_err(|e| VerbotenError::CatalogError(format!("Failed to parse words: {}", e)))?;

        let mut words = HashMap::new();
        for (code, mut entries) in raw {
            let language: Language = code.parse()?;
            for entry in &mut entries {
                entry.language = Some(language);
            }
            words.insert(language, entries);
        }

        Ok(Self { words })
    }

    /// Entries for a language, in file order.
    pub fn words(&self, language: Language) -> &[ForbiddenWord] {
        self.words.get(&language).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pick a uniformly random entry for `language`.
    pub fn pick<R: Rng + ?Sized>(&self, language: Language, rng: &mut R) -> Result<&ForbiddenWord> {
        let entries = self.words(language);
        if entries.is_empty() {
            return Err(VerbotenError::CatalogError(format!(
                "No words available for language '{}'",
                language
            )));
        }
        Ok(&entries[rng.gen_range(0..entries.len())])
    }

    /// Pick an entry with a generator seeded from `seed`.
    pub fn pick_seeded(&self, language: Language, seed: u64) -> Result<&ForbiddenWord> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.pick(language, &mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    const FIXTURE: &str = r#"{
        "en": [{"word": "Rope", "forbidden": ["Cord", "String"]}],
        "fr": [],
        "ar": []
    }"#;

    #[test]
    fn test_load_and_select_single_entry() {
        let catalog = WordCatalog::from_json(FIXTURE).unwrap();
        let entry = catalog.pick_seeded(Language::En, 42).unwrap();

        assert_eq!(entry.word, "Rope");
        assert_eq!(entry.forbidden, vec!["Cord", "String"]);
        assert_eq!(entry.language, Some(Language::En));
        assert_eq!(normalize(&entry.word), "rope");
    }

    #[test]
    fn test_pick_from_empty_language_fails() {
        let catalog = WordCatalog::from_json(FIXTURE).unwrap();
        assert!(matches!(
            catalog.pick_seeded(Language::Fr, 1),
            Err(VerbotenError::CatalogError(_))
        ));
    }

    #[test]
    fn test_same_seed_same_word() {
        let catalog = WordCatalog::from_json(
            r#"{"en": [
                {"word": "Rope", "forbidden": []},
                {"word": "Tree", "forbidden": []},
                {"word": "Cloud", "forbidden": []}
            ]}"#,
        )
        .unwrap();

        let a = catalog.pick_seeded(Language::En, 7).unwrap();
        let b = catalog.pick_seeded(Language::En, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_language_key_is_rejected() {
        let result = WordCatalog::from_json(r#"{"de": []}"#);
        assert!(matches!(result, Err(VerbotenError::UnsupportedLanguage(_))));
    }

    #[test]
    fn test_all_proscribed_lists_secret_first() {
        let entry = ForbiddenWord::new("Rope", vec!["Cord".into(), "String".into()]);
        assert_eq!(entry.all_proscribed(), vec!["Rope", "Cord", "String"]);
    }

    #[test]
    fn test_bundled_catalog_parses() {
        let catalog = WordCatalog::from_json(include_str!("../../../assets/words.json")).unwrap();
        for language in Language::ALL {
            assert!(!catalog.words(language).is_empty());
        }
    }
}

//! Supported game languages and their localized text.
//!
//! Prompts and UI phrases are plain data; nothing in here branches on their
//! content.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VerbotenError;

/// A language a game can be played in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Fr,
    Ar,
}

impl Language {
    /// All supported languages, in menu order.
    pub const ALL: [Language; 3] = [Language::En, Language::Fr, Language::Ar];

    /// Two-letter code used in URLs and the word catalog.
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
            Language::Ar => "ar",
        }
    }

    /// English name of the language, as given to the translation check.
    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Fr => "French",
            Language::Ar => "Arabic",
        }
    }

    /// System instruction for the live guesser session.
    pub fn live_guesser_prompt(&self) -> &'static str {
        match self {
            Language::En => LIVE_GUESSER_EN,
            Language::Fr => LIVE_GUESSER_FR,
            Language::Ar => LIVE_GUESSER_AR,
        }
    }

    /// System instruction for the turn-based guesser chat.
    pub fn guesser_instructions(&self) -> &'static str {
        match self {
            Language::En => GUESSER_EN,
            Language::Fr => GUESSER_FR,
            Language::Ar => GUESSER_AR,
        }
    }

    /// Console phrases for the turn-based game.
    pub fn phrases(&self) -> &'static Phrases {
        match self {
            Language::En => &PHRASES_EN,
            Language::Fr => &PHRASES_FR,
            Language::Ar => &PHRASES_AR,
        }
    }

    /// Comma-separated codes, for prompts and error messages.
    pub fn supported_codes() -> String {
        Self::ALL
            .iter()
            .map(|l| l.code())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = VerbotenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "fr" => Ok(Language::Fr),
            "ar" => Ok(Language::Ar),
            other => Err(VerbotenError::UnsupportedLanguage(other.to_string())),
        }
    }
}

/// Console phrases. Entries containing `{}` are filled in order.
#[derive(Debug)]
pub struct Phrases {
    pub choose_language: &'static str,
    pub word_to_describe: &'static str,
    pub forbidden_words_are: &'static str,
    pub describe_the_word: &'static str,
    pub used_forbidden_word: &'static str,
    pub used_forbidden_inflection: &'static str,
    pub ai_guess: &'static str,
    pub ai_guessed_the_word: &'static str,
    pub word_was: &'static str,
}

/// Replace each `{}` in `template` with the next argument.
pub fn fill(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;
    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        out.push_str(args.next().copied().unwrap_or(""));
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

static PHRASES_EN: Phrases = Phrases {
    choose_language: "Choose your language (en/fr/ar): ",
    word_to_describe: "The word to describe is: {}",
    forbidden_words_are: "The proscribed words are: {}",
    describe_the_word: "Describe the word.",
    used_forbidden_word: "Oh! You used the proscribed word '{}'. You lose!",
    used_forbidden_inflection: "Oh! You said '{}' which is too close to the proscribed word '{}'. You lose!",
    ai_guess: "AI: {}",
    ai_guessed_the_word: "The AI guessed the word! You win!",
    word_was: "The word was {}. You lose!",
};

static PHRASES_FR: Phrases = Phrases {
    choose_language: "Choisissez votre langue (en/fr/ar) : ",
    word_to_describe: "Le mot à décrire est : {}",
    forbidden_words_are: "Les mots prohibés sont : {}",
    describe_the_word: "Décrivez le mot.",
    used_forbidden_word: "Oh ! Vous avez utilisé le mot prohibé '{}'. Vous avez perdu !",
    used_forbidden_inflection: "Oh ! Vous avez dit '{}' qui est trop proche du mot prohibé '{}'. Vous avez perdu !",
    ai_guess: "IA : {}",
    ai_guessed_the_word: "L'IA a deviné le mot ! Vous avez gagné !",
    word_was: "Le mot était {}. Vous avez perdu !",
};

static PHRASES_AR: Phrases = Phrases {
    choose_language: "اختر لغتك (en/fr/ar): ",
    word_to_describe: "الكلمة التي يجب وصفها هي: {}",
    forbidden_words_are: "الكلمات الممنوعة هي: {}",
    describe_the_word: "صف الكلمة.",
    used_forbidden_word: "أوه! لقد استخدمت الكلمة الممنوعة '{}'. لقد خسرت!",
    used_forbidden_inflection: "أوه! لقد قلت '{}' وهي قريبة جدًا من الكلمة الممنوعة '{}'. لقد خسرت!",
    ai_guess: "الذكاء الاصطناعي: {}",
    ai_guessed_the_word: "لقد خمن الذكاء الاصطناعي الكلمة! لقد فزت!",
    word_was: "كانت الكلمة {}. لقد خسرت!",
};

const LIVE_GUESSER_EN: &str = r#"You are playing the "guessing word" game where the human player with their microphone
is describing a word. Your job is to listen to the description and say only one word as
your guess, every few seconds. You have only 3 guesses.
Don't say anything else than the word you're guessing."#;

const LIVE_GUESSER_FR: &str = r#"Vous jouez au jeu du "mot à deviner" où le joueur humain avec son microphone
décrit un mot. Votre travail consiste à écouter la description et à ne dire qu'un seul mot comme
votre suggestion, toutes les quelques secondes. Vous n'avez que 3 essais.
Ne dites rien d'autre que le mot que vous devinez."#;

const LIVE_GUESSER_AR: &str = r#"أنت تلعب لعبة "تخمين الكلمات" حيث يقوم اللاعب البشري بميكروفونه بوصف كلمة.
مهمتك هي الاستماع إلى الوصف وقول كلمة واحدة فقط كتخمين، كل بضع ثوان.
لديك 3 تخمينات فقط.
لا تقل أي شيء آخر غير الكلمة التي تخمنها."#;

const GUESSER_EN: &str = r#"You are the guesser in a game of "Proscribed Words".
I will describe a word to you. You have to guess what it is.
You only have 3 guesses.
I know the word to guess, but I cannot say it to you.
I also cannot say several other proscribed words.
Answer only in English.
Answer only with the word you think is the one I'm trying to let you guess.
Let's start."#;

const GUESSER_FR: &str = r#"Tu es le devineur dans une partie de "Mots Prohibés".
Je vais te décrire un mot. Tu dois deviner ce que c'est.
Tu n'as que 3 essais.
Je connais le mot à faire deviner, mais je ne peux pas te le dire.
Je ne peux pas non plus te dire plusieurs mots prohibés.
Réponds uniquement en Français.
Réponds uniquement le mot que tu supposes être celui que j'essaie de faire deviner.
Commençons."#;

const GUESSER_AR: &str = r#"أنت المخمن في لعبة "الكلمات الممنوعة".
سأصف لك كلمة. عليك أن تخمن ما هي.
لديك 3 محاولات فقط.
أعرف الكلمة التي يجب تخمينها، لكن لا يمكنني قولها لك.
كما لا يمكنني قول العديد من الكلمات الممنوعة الأخرى.
أجب باللغة العربية فقط.
أجب فقط بالكلمة التي تعتقد أنها الكلمة التي أحاول أن أجعلك تخمنها.
لنبدأ."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_code() {
        assert_eq!("fr".parse::<Language>().unwrap(), Language::Fr);
        assert_eq!(" AR ".parse::<Language>().unwrap(), Language::Ar);
        assert!(matches!(
            "de".parse::<Language>(),
            Err(VerbotenError::UnsupportedLanguage(code)) if code == "de"
        ));
    }

    #[test]
    fn test_fill_placeholders_in_order() {
        let phrases = Language::En.phrases();
        assert_eq!(
            fill(phrases.used_forbidden_inflection, &["poussent", "Pousser"]),
            "Oh! You said 'poussent' which is too close to the proscribed word 'Pousser'. You lose!"
        );
        assert_eq!(fill("no placeholder", &["x"]), "no placeholder");
        assert_eq!(fill("{} and {}", &["a"]), "a and ");
    }

    #[test]
    fn test_supported_codes() {
        assert_eq!(Language::supported_codes(), "en/fr/ar");
    }
}

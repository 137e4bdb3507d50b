//! Verboten CLI - Proscribed Words
//!
//! Describe a word to an AI guesser without saying any of its proscribed
//! words. An AI judge watches every description.

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use verboten_core::language::{Phrases, fill};
use verboten_core::{
    BackendConfig, ChatModel, Config, GameEvent, Language, OpenAiChatModel, TurnGame, TurnOutcome,
    WordCatalog,
};

#[derive(Parser)]
#[command(
    name = "verboten",
    version,
    about = "Proscribed Words - describe a word to an AI without saying the forbidden ones",
    long_about = "An interactive word game against an AI guesser and an AI judge, using a Gemini backend."
)]
struct Cli {
    /// Settings file (TOML)
    #[arg(short, long, default_value = "verboten.toml", value_name = "FILE")]
    config: PathBuf,

    /// Word catalog to use instead of the configured one
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Language to play in (en/fr/ar); asked interactively when omitted
    #[arg(short, long, value_name = "LANG")]
    language: Option<Language>,

    /// Seed for picking the word
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
}

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    // Logs go to stderr so the game text on stdout stays readable.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(catalog) = cli.catalog {
        config.game.catalog_path = catalog;
    }
    let catalog = WordCatalog::load(&config.game.catalog_path)?;
    let backend = BackendConfig::from_env()?;
    let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::new(&backend, &config.game)?);

    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();

    let language = match cli.language {
        Some(language) => language,
        None => match choose_language(&mut input).await? {
            Some(language) => language,
            None => return Ok(()),
        },
    };
    let phrases = language.phrases();

    let seed = cli.seed.unwrap_or_else(time_seed);
    let entry = catalog.pick_seeded(language, seed)?.clone();
    let mut game = TurnGame::new(model, entry, language, config.game.guesses)
        .with_callback(create_console_callback(phrases));

    let entry = game.entry();
    println!();
    println!("{}", "═".repeat(60).bright_blue());
    println!(
        "  {}",
        fill(phrases.word_to_describe, &[&entry.word]).bright_white().bold()
    );
    println!(
        "  {}",
        fill(phrases.forbidden_words_are, &[&entry.forbidden.join(", ")]).red()
    );
    println!("{}", "═".repeat(60).bright_blue());
    println!();

    while !game.is_finished() {
        println!("{}", phrases.describe_the_word.bold());
        let Some(description) = read_line(&mut input, "> ").await? else {
            break;
        };
        if description.is_empty() {
            continue;
        }

        match game.play_turn(&description).await {
            Ok(outcome) => print_outcome(phrases, &outcome),
            // The turn was not consumed, ask again.
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
    }

    Ok(())
}

/// Ask until the player names a supported language. `None` on end of input.
async fn choose_language(input: &mut Input) -> Result<Option<Language>, Box<dyn std::error::Error>> {
    let prompt = Language::ALL
        .iter()
        .map(|lang| lang.phrases().choose_language)
        .collect::<Vec<_>>()
        .join("\n");

    loop {
        let Some(answer) = read_line(input, &prompt).await? else {
            return Ok(None);
        };
        match answer.parse::<Language>() {
            Ok(language) => return Ok(Some(language)),
            Err(e) => eprintln!("{}", format!("{} ({})", e, Language::supported_codes()).yellow()),
        }
    }
}

async fn read_line(input: &mut Input, prompt: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn print_outcome(phrases: &Phrases, outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Lost { verdict, exact: true } => {
            println!("{}", fill(phrases.used_forbidden_word, &[&verdict.forbidden_word]).red().bold());
        }
        TurnOutcome::Lost { verdict, exact: false } => {
            println!(
                "{}",
                fill(
                    phrases.used_forbidden_inflection,
                    &[&verdict.fragment, &verdict.forbidden_word]
                )
                .red()
                .bold()
            );
        }
        TurnOutcome::Won { .. } => {
            println!("{}", phrases.ai_guessed_the_word.bright_green().bold());
        }
        TurnOutcome::Missed { remaining, .. } => {
            println!("{}", format!("({} left)", remaining).dimmed());
        }
        TurnOutcome::OutOfGuesses { word, .. } => {
            println!("{}", fill(phrases.word_was, &[word]).red().bold());
        }
    }
    println!();
}

/// Create a callback that prints game events to the console.
fn create_console_callback(phrases: &'static Phrases) -> Box<dyn Fn(GameEvent) + Send + Sync> {
    Box::new(move |event| match event {
        GameEvent::TurnStart { .. } => {}
        GameEvent::Guess { text } => {
            println!("{} {}", "▶".bright_cyan(), fill(phrases.ai_guess, &[&text]).bright_cyan());
        }
        GameEvent::TurnEnd(_) => {
            // Handled in main
        }
    })
}

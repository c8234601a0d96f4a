use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use flag_core::model::{LearningStats, LearningStatus, QuizStatus};
use services::{
    ApiConfig, HttpSessionApi, LearningConfig, LearningEngine, QuizConfig, QuizEngine,
    QuizSnapshot, SessionApi,
};
use storage::repository::{AuthTokens, TokenStore};
use storage::sqlite::{normalize_sqlite_url, token_store};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCount { raw: String },
    InvalidDbUrl { raw: String },
    MissingToken,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --add value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingToken => write!(f, "token requires an access token"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  flagquiz quiz   [--api <url>] [--db <sqlite_url>] [--token <access>]");
    eprintln!("  flagquiz learn  [--api <url>] [--db <sqlite_url>] [--add <n>]");
    eprintln!("  flagquiz stats  [--api <url>] [--db <sqlite_url>]");
    eprintln!("  flagquiz token  <access> [refresh] [--db <sqlite_url>]");
    eprintln!("  flagquiz logout [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --api {}", ApiConfig::DEFAULT_BASE_URL);
    eprintln!("  --db  sqlite://flagquiz.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  FLAGQUIZ_API_URL, FLAGQUIZ_DB_URL, FLAGQUIZ_ACCESS_TOKEN, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quiz,
    Learn,
    Stats,
    Token,
    Logout,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "quiz" => Some(Self::Quiz),
            "learn" => Some(Self::Learn),
            "stats" => Some(Self::Stats),
            "token" => Some(Self::Token),
            "logout" => Some(Self::Logout),
            _ => None,
        }
    }
}

struct Args {
    api_url: Option<String>,
    db_url: String,
    token: Option<String>,
    add_cards: Option<u32>,
    positional: Vec<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut api_url = None;
        let mut db_url = std::env::var("FLAGQUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://flagquiz.sqlite3".into(), |raw| normalize_sqlite_url(&raw));
        let mut token = std::env::var("FLAGQUIZ_ACCESS_TOKEN")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let mut add_cards = None;
        let mut positional = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api" => api_url = Some(require_value(args, "--api")?),
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(&value);
                }
                "--token" => token = Some(require_value(args, "--token")?),
                "--add" => {
                    let value = require_value(args, "--add")?;
                    let parsed: u32 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCount { raw: value.clone() })?;
                    add_cards = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other if other.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        Ok(Self {
            api_url,
            db_url,
            token,
            add_cards,
            positional,
        })
    }

    fn api_config(&self) -> Result<ApiConfig, services::ApiError> {
        match &self.api_url {
            Some(raw) => ApiConfig::new(raw),
            None => ApiConfig::from_env(),
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: play a quiz when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Quiz,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Quiz,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let tokens = token_store(&parsed.db_url).await?;
    if let Some(access) = &parsed.token {
        tokens
            .save_tokens(&AuthTokens::new(access.clone(), None, Utc::now()))
            .await?;
    }

    match cmd {
        Command::Token => {
            let mut positional = parsed.positional.into_iter();
            let access = positional.next().ok_or(ArgsError::MissingToken)?;
            let refresh = positional.next();
            tokens
                .save_tokens(&AuthTokens::new(access, refresh, Utc::now()))
                .await?;
            println!("token saved");
            Ok(())
        }
        Command::Logout => {
            tokens.clear_tokens().await?;
            println!("signed out");
            Ok(())
        }
        Command::Quiz | Command::Learn | Command::Stats => {
            let config = parsed.api_config()?;
            info!("using session service at {}", config.base_url());
            let api: Arc<dyn SessionApi> = Arc::new(HttpSessionApi::new(config, Arc::clone(&tokens)));
            match cmd {
                Command::Quiz => play_quiz(api).await,
                Command::Learn => review_cards(api, parsed.add_cards).await,
                _ => show_stats(api).await,
            }
        }
    }
}

type Input = Lines<BufReader<Stdin>>;

fn stdin_lines() -> Input {
    BufReader::new(tokio::io::stdin()).lines()
}

async fn play_quiz(api: Arc<dyn SessionApi>) -> Result<(), Box<dyn std::error::Error>> {
    let quiz = QuizEngine::new(api, QuizConfig::default());
    let mut updates = quiz.subscribe();

    // Render every published change, timer-driven ones included.
    let renderer = tokio::spawn(async move {
        let mut last_question = None;
        let mut showed_feedback = false;
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            let question = snapshot.current_question.as_ref().map(|q| q.id);
            if question.is_some() && question != last_question {
                render_question(&snapshot);
            }
            last_question = question;
            match &snapshot.feedback {
                Some(feedback) if !showed_feedback => {
                    println!("Correct! It's {}.", feedback.correct_answer);
                    showed_feedback = true;
                }
                None => showed_feedback = false,
                _ => {}
            }
            if snapshot.status == QuizStatus::GameOver {
                break;
            }
        }
    });

    quiz.start().await?;
    println!("Type your guess; it is checked automatically. /skip, /next, /quit");

    let mut input = stdin_lines();
    let mut status = quiz.subscribe();
    while quiz.snapshot().status == QuizStatus::Playing {
        // Wake on engine changes too, so a game ended by auto-advance is noticed.
        let line = tokio::select! {
            line = input.next_line() => line?,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        };
        let Some(line) = line else {
            break;
        };
        let outcome = match line.trim() {
            "/skip" => quiz.skip().await.map(drop),
            "/next" => quiz.next_question().await.map(drop),
            "/quit" => quiz.finish().await.map(drop),
            guess => quiz.submit_answer_for_check(guess).map(drop),
        };
        if let Err(err) = outcome {
            eprintln!("{err}");
        }
    }

    if quiz.snapshot().status == QuizStatus::Playing {
        quiz.finish().await?;
    }
    renderer.abort();
    render_summary(&quiz.snapshot());
    Ok(())
}

fn render_question(snapshot: &QuizSnapshot) {
    let Some(question) = &snapshot.current_question else {
        return;
    };
    let flag = question
        .flag_emoji
        .as_deref()
        .unwrap_or(question.flag_image_url.as_str());
    println!(
        "\n[{}] score {} | skips {} | seen {} | {}",
        snapshot.elapsed, snapshot.score, snapshot.skips_remaining, snapshot.countries_viewed, flag
    );
}

fn render_summary(snapshot: &QuizSnapshot) {
    let Some(summary) = snapshot.summary() else {
        return;
    };
    println!("\n{}", summary.performance().label());
    println!("Final score: {}", summary.final_score);
    match summary.total_countries {
        Some(total) => println!("Countries: {}/{total}", summary.countries_viewed),
        None => println!("Countries: {}", summary.countries_viewed),
    }
    println!("Time: {}", summary.elapsed);
}

async fn review_cards(
    api: Arc<dyn SessionApi>,
    add_cards: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut learning = LearningEngine::new(api, LearningConfig::default());
    learning.start_learning().await?;

    let mut input = stdin_lines();
    if learning.status() == LearningStatus::NoCards {
        let count = match add_cards {
            Some(count) => count,
            None => {
                let count = learning.config().default_new_cards;
                println!("No flags due. Enroll {count} new ones? [y/n]");
                match input.next_line().await?.as_deref().map(str::trim) {
                    Some("y" | "Y") => count,
                    _ => return Ok(()),
                }
            }
        };
        learning.add_new_cards(count).await?;
        if learning.status() == LearningStatus::NoCards {
            println!("No flags due.");
            return Ok(());
        }
    }

    while let Some(card) = learning.current_card().cloned() {
        let progress = learning.progress();
        println!(
            "\nCard {}/{} (box {}) {}",
            progress.position + 1,
            progress.total,
            card.box_number.value(),
            if card.flag_emoji.is_empty() { &card.flag_image_url } else { &card.flag_emoji }
        );
        println!("Press enter to reveal.");
        if input.next_line().await?.is_none() {
            return Ok(());
        }
        learning.reveal_answer()?;
        println!("{} ({})", card.country_name, card.country_code);

        let is_correct = loop {
            println!("Did you know it? [y/n]");
            match input.next_line().await?.as_deref().map(str::trim) {
                Some("y" | "Y") => break true,
                Some("n" | "N") => break false,
                Some(_) => continue,
                None => return Ok(()),
            }
        };
        if let Err(err) = learning.submit_review(is_correct).await {
            eprintln!("{err}");
        }
    }

    let snapshot = learning.snapshot();
    println!(
        "\nReviewed {} flags, {} correct.",
        snapshot.tally.reviewed, snapshot.tally.correct
    );
    if let Some(stats) = &snapshot.stats {
        render_stats(stats);
    }
    Ok(())
}

async fn show_stats(api: Arc<dyn SessionApi>) -> Result<(), Box<dyn std::error::Error>> {
    let mut learning = LearningEngine::new(api, LearningConfig::default());
    let stats = learning.refresh_stats().await?;
    render_stats(&stats);
    Ok(())
}

fn render_stats(stats: &LearningStats) {
    println!(
        "Due: {} | Learning: {} | Accuracy: {:.0}%",
        stats.due_flags, stats.total_flags, stats.average_accuracy
    );
    for (index, count) in stats.box_distribution.counts().iter().enumerate() {
        println!("  box {}: {count}", index + 1);
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url.starts_with("sqlite::memory:") || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use services::{BankQuestionSource, Clock, LlmQuestionSource, QuestionSource, QuizLoopService};
use storage::repository::{StatsRepository, Storage};
use tracing_subscriber::EnvFilter;

mod play;
mod render;

use play::{QuestionLoader, QuizApp};

#[derive(Debug)]
enum ArgsError {
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Parser)]
#[command(name = "drone-quiz", version, about = "Drone regulation quiz")]
struct Cli {
    /// SQLite database holding stats and the seen-question log
    #[arg(
        long = "db",
        env = "QUIZ_DB_URL",
        default_value = "sqlite://quiz.sqlite3",
        global = true
    )]
    db_url: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play a quiz (default)
    Play(PlayArgs),
    /// Generate a question set and print it
    Generate {
        #[command(flatten)]
        source: SourceArgs,
        /// Print the validated set as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show running stats
    Stats,
}

#[derive(Args, Clone, Debug)]
struct SourceArgs {
    /// Number of questions to request (1-10)
    #[arg(long, short = 'n', default_value_t = 5)]
    count: u32,
    /// Use the built-in question bank instead of remote generation
    #[arg(long)]
    offline: bool,
    /// Stream the generated questions as they arrive
    #[arg(long, conflicts_with = "offline")]
    stream: bool,
    /// Reject sets that do not contain exactly `count` questions
    #[arg(long)]
    strict: bool,
}

impl Default for SourceArgs {
    fn default() -> Self {
        Self {
            count: 5,
            offline: false,
            stream: false,
            strict: false,
        }
    }
}

#[derive(Args, Clone, Debug)]
struct PlayArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Pause after each answer before moving on, in milliseconds
    #[arg(long, default_value_t = 1500)]
    delay_ms: u64,
}

impl Default for PlayArgs {
    fn default() -> Self {
        Self {
            source: SourceArgs::default(),
            delay_ms: 1500,
        }
    }
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
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

/// Pick the question source: the bank when asked for or when no API key is set.
fn build_loader(args: &SourceArgs) -> Result<QuestionLoader, Box<dyn std::error::Error>> {
    if !args.offline {
        let llm = LlmQuestionSource::from_env()?;
        if llm.enabled() {
            return Ok(QuestionLoader::Llm {
                source: Arc::new(llm),
                stream: args.stream,
            });
        }
        tracing::info!("QUIZ_AI_API_KEY not set; falling back to the question bank");
        eprintln!("No API key configured (QUIZ_AI_API_KEY); using the built-in question bank.");
    }
    Ok(QuestionLoader::Bank(Arc::new(BankQuestionSource::builtin()?)))
}

fn build_service(storage: &Storage, loader: &QuestionLoader, args: &SourceArgs) -> QuizLoopService {
    let source: Arc<dyn QuestionSource> = match loader {
        QuestionLoader::Llm { source, .. } => Arc::clone(source) as Arc<dyn QuestionSource>,
        QuestionLoader::Bank(source) => Arc::clone(source) as Arc<dyn QuestionSource>,
    };
    QuizLoopService::new(
        Clock::system(),
        source,
        Arc::clone(&storage.stats),
        Arc::clone(&storage.seen),
    )
    .with_strict_count(args.strict)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    let db_url = normalize_sqlite_url(&cli.db_url);
    prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url).await?;

    match cli.command.unwrap_or_else(|| Command::Play(PlayArgs::default())) {
        Command::Play(args) => {
            let loader = build_loader(&args.source)?;
            let service = build_service(&storage, &loader, &args.source)
                .with_advance_delay(Duration::from_millis(args.delay_ms));
            QuizApp::new(service, loader, args.source.count)
                .run()
                .await?;
        }
        Command::Generate { source, json } => {
            let loader = build_loader(&source)?;
            let service = build_service(&storage, &loader, &source);
            let set = loader.load(&service, source.count).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&set)?);
            } else {
                render::question_set(&set);
            }
        }
        Command::Stats => {
            let stats = storage.stats.load_stats().await?.unwrap_or_default();
            render::stats(&stats);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/quiz.db"),
            "sqlite:///tmp/quiz.db"
        );
        assert_eq!(normalize_sqlite_url("/tmp/quiz.db"), "sqlite:///tmp/quiz.db");
        assert!(normalize_sqlite_url("quiz.db").starts_with("sqlite:///"));
    }

    #[test]
    fn play_is_the_default_command() {
        let cli = Cli::try_parse_from(["drone-quiz"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["drone-quiz", "play", "-n", "3", "--offline"]).unwrap();
        match cli.command {
            Some(Command::Play(args)) => {
                assert_eq!(args.source.count, 3);
                assert!(args.source.offline);
                assert_eq!(args.delay_ms, 1500);
            }
            _ => panic!("expected play"),
        }
    }

    #[test]
    fn stream_conflicts_with_offline() {
        assert!(Cli::try_parse_from(["drone-quiz", "generate", "--offline", "--stream"]).is_err());
    }

    #[test]
    fn memory_database_needs_no_file() {
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
        assert!(prepare_sqlite_file("postgres://x").is_err());
    }
}

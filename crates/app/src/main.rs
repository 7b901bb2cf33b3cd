use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use exam_core::Clock;
use exam_core::auth::LoginGate;
use exam_core::catalog::DEFINITION_NAMES;
use exam_core::model::TimingMode;
use exam_core::report::render_message;
use exam_core::session::{ExamSession, ExamState, Step};
use services::config::{parse_relay_url, parse_zero_band};
use services::{
    ExamConfig, ExamRunner, ExamSnapshot, Finishing, HistoryService, HttpRelay,
    NotificationRelay, RunnerError, open_storage,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

mod console;

use console::{Command, HELP, status_line};

/// Timed mock exam in the terminal
#[derive(Parser)]
#[command(name = "exam")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Result store, e.g. `sqlite://results.db`; in memory when omitted
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sit an exam (default)
    Run(RunArgs),

    /// List stored results, newest first
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Print the full message for one stored result
    Show { id: i64 },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Candidate name accepted at login
    #[arg(long)]
    candidate: Option<String>,

    /// Test definition to sit
    #[arg(long, value_parser = clap::builder::PossibleValuesParser::new(DEFINITION_NAMES))]
    definition: Option<String>,

    /// Use one-minute sections
    #[arg(long)]
    dev: bool,

    /// Relay endpoint that receives the result message
    #[arg(long)]
    relay: Option<String>,

    /// Seconds to wait for the relay before completing anyway
    #[arg(long)]
    grace_secs: Option<u64>,

    /// Band for zero correct answers: `floor` (2.0) or `zero`
    #[arg(long)]
    zero_band: Option<String>,
}

impl RunArgs {
    fn apply(self, config: &mut ExamConfig) -> anyhow::Result<()> {
        if let Some(candidate) = self.candidate {
            config.candidate = candidate.trim().to_string();
        }
        if let Some(definition) = self.definition {
            config.definition = definition;
        }
        if self.dev {
            config.mode = TimingMode::Development;
        }
        if let Some(relay) = self.relay {
            config.relay_url = Some(parse_relay_url(&relay)?);
        }
        if let Some(secs) = self.grace_secs {
            config.grace = Duration::from_secs(secs);
        }
        if let Some(zero_band) = self.zero_band {
            config.zero_score = Some(parse_zero_band(&zero_band)?);
        }
        Ok(())
    }
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") || trimmed.starts_with("sqlite:file:") {
        return trimmed.to_string();
    }
    let path = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file and its directory exist before `SQLite` opens it.
fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database url: {db_url}");
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

async fn open_results(db: Option<&str>) -> anyhow::Result<storage::repository::Storage> {
    let url = db.map(normalize_sqlite_url);
    if let Some(url) = &url {
        prepare_sqlite_file(url)?;
    }
    Ok(open_storage(url.as_deref()).await?)
}

type Input = Lines<BufReader<Stdin>>;

async fn prompt(lines: &mut Input, text: &str) -> anyhow::Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines.next_line().await?)
}

async fn run_exam(mut config: ExamConfig, args: RunArgs) -> anyhow::Result<()> {
    args.apply(&mut config)?;
    let definition = Arc::new(config.test_definition()?);
    let storage = open_results(config.db_url.as_deref()).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let gate = LoginGate::new(config.candidate.clone());
    let context = loop {
        let Some(name) = prompt(&mut lines, "Name: ").await? else {
            return Ok(());
        };
        match gate.login(&name) {
            Ok(context) => break context,
            Err(err) => {
                tracing::warn!(name = name.trim(), "login rejected");
                println!("{err}. Please try again.");
            }
        }
    };

    let relay: Option<Arc<dyn NotificationRelay>> = config
        .relay_url
        .clone()
        .map(|url| Arc::new(HttpRelay::new(url)) as Arc<dyn NotificationRelay>);
    let session = ExamSession::new(Arc::clone(&definition), config.mode, Clock::system());
    let runner = ExamRunner::new(
        session,
        context,
        Finishing {
            results: Arc::clone(&storage.results),
            relay,
            grace: config.grace,
        },
    );

    println!("{}", definition.title());
    println!("{HELP}\n");
    runner.start().await?;
    println!("{}", status_line(&runner.snapshot()));

    let mut updates = runner.subscribe();
    let mut last_shown = runner.snapshot();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if moved(&last_shown, &snapshot) {
                    println!("{}", status_line(&snapshot));
                    if let Some(err) = &snapshot.last_error {
                        println!("{err}");
                    }
                }
                last_shown = snapshot;
                if last_shown.state == ExamState::Complete {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    if runner.snapshot().state == ExamState::Active {
                        tracing::info!("input closed before the exam finished");
                        return Ok(());
                    }
                    break;
                };
                if !handle_line(&runner, &line).await {
                    return Ok(());
                }
            }
        }
    }

    let done = runner.wait_complete().await;
    if let Some(record) = &done.result {
        println!("\n{}", render_message(record));
    }
    Ok(())
}

/// Announce section, sub-part and state changes, not every tick.
fn moved(before: &ExamSnapshot, after: &ExamSnapshot) -> bool {
    before.position != after.position
        || before.state != after.state
        || before.last_error != after.last_error
}

/// Returns `false` when the candidate quits.
async fn handle_line(runner: &ExamRunner, line: &str) -> bool {
    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(err) => {
            println!("{err}");
            return true;
        }
    };

    let outcome: Result<(), RunnerError> = match command {
        Command::Answer { question, text } => runner.set_answer(question - 1, text).await,
        Command::Write { task, text } => runner.set_response(task - 1, text).await,
        Command::Next => {
            let at = runner.snapshot().position;
            runner.advance_from(at).await.map(|step| {
                if step == Step::Stale {
                    tracing::debug!(?at, "next ignored; already moved on");
                }
            })
        }
        Command::Finish => runner.finish_section().await.map(|_| ()),
        Command::Status => {
            println!("{}", status_line(&runner.snapshot()));
            Ok(())
        }
        Command::Help => {
            println!("{HELP}");
            Ok(())
        }
        Command::Quit => {
            tracing::info!("candidate left before submitting");
            return false;
        }
    };

    if let Err(err) = outcome {
        println!("{err}");
    }
    true
}

async fn show_history(db: Option<&str>, limit: u32) -> anyhow::Result<()> {
    let storage = open_results(db).await?;
    let history = HistoryService::new(storage.results);
    let entries = history.recent(limit).await?;
    if entries.is_empty() {
        println!("no results yet");
    }
    for entry in entries {
        let band = entry
            .overall_band
            .map_or_else(|| "-".to_string(), |b| b.to_string());
        println!(
            "#{:<4} {}  {:<28} {:<28} {band}",
            entry.id,
            entry.completed_at.format("%Y-%m-%d %H:%M"),
            entry.student,
            entry.title,
        );
    }
    Ok(())
}

async fn show_result(db: Option<&str>, id: i64) -> anyhow::Result<()> {
    let storage = open_results(db).await?;
    let record = HistoryService::new(storage.results)
        .get(id)
        .await
        .with_context(|| format!("result #{id}"))?;
    println!("{}", render_message(&record));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ExamConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_url = Some(db);
    }

    match cli.command.unwrap_or_else(|| Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run_exam(config, args).await,
        Commands::History { limit } => show_history(config.db_url.as_deref(), limit).await,
        Commands::Show { id } => show_result(config.db_url.as_deref(), id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_environment() {
        let cli = Cli::try_parse_from([
            "exam",
            "run",
            "--candidate",
            " Jane ",
            "--definition",
            "practice",
            "--dev",
            "--grace-secs",
            "1",
            "--zero-band",
            "zero",
        ])
        .unwrap();
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };

        let mut config = ExamConfig::default();
        args.apply(&mut config).unwrap();
        assert_eq!(config.candidate, "Jane");
        assert_eq!(config.definition, "practice");
        assert_eq!(config.mode, TimingMode::Development);
        assert_eq!(config.grace, Duration::from_secs(1));
        assert!(config.zero_score.is_some());
    }

    #[test]
    fn unknown_definition_is_rejected_by_cli() {
        assert!(Cli::try_parse_from(["exam", "run", "--definition", "toefl"]).is_err());
    }

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/results.db"),
            "sqlite:///tmp/results.db"
        );
        assert_eq!(normalize_sqlite_url("/tmp/results.db"), "sqlite:///tmp/results.db");
        assert!(normalize_sqlite_url("results.db").ends_with("/results.db"));
    }
}

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use classroom_study::db::date_utils::local_study_day;
use classroom_study::db::SqliteRepository;
use classroom_study::{Config, GradingEvent, SessionRunner};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "study", version, about = "Grade flashcards and inspect review schedules")]
struct Cli {
    /// Progress database (overrides STUDY_DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply one quality grade (0-5) to a card
    Grade {
        #[arg(long)]
        learner: i64,
        #[arg(long)]
        card: i64,
        #[arg(long, allow_hyphen_values = true)]
        quality: i64,
        /// Study day of the review (defaults to the current study day)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Idempotency key for client retries
        #[arg(long)]
        event_id: Option<Uuid>,
    },
    /// Count cards due for a learner
    Due {
        #[arg(long)]
        learner: i64,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Show the study queue for a deck
    Queue {
        #[arg(long)]
        learner: i64,
        #[arg(long)]
        deck: i64,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Apply grading events from a JSON-lines file, in order
    Replay { file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(path) = cli.database {
        config.database_path = path;
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    tracing::debug!(path = %config.database_path.display(), "opening progress database");
    let repo = SqliteRepository::open(&config.database_path, config.busy_timeout)?;
    let mut runner = SessionRunner::new(repo, &config);
    let study_day = |today: Option<NaiveDate>| {
        today.unwrap_or_else(|| local_study_day(config.daily_reset_hour))
    };

    match cli.command {
        Command::Grade {
            learner,
            card,
            quality,
            today,
            event_id,
        } => {
            let event = GradingEvent {
                event_id,
                learner_id: learner,
                card_id: card,
                quality,
                occurred_on: study_day(today),
            };
            let outcome = runner.grade(&event)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Due { learner, today } => {
            let today = study_day(today);
            let due = runner.cards_due(learner, today)?;
            println!(
                "{}",
                serde_json::json!({ "learner_id": learner, "today": today, "cards_due": due })
            );
        }
        Command::Queue {
            learner,
            deck,
            today,
        } => {
            let queue = runner.queue(learner, deck, study_day(today))?;
            println!("{}", serde_json::to_string_pretty(&queue)?);
        }
        Command::Replay { file } => {
            let reader = BufReader::new(
                File::open(&file).with_context(|| format!("opening {}", file.display()))?,
            );
            let (mut applied, mut duplicates, mut failed) = (0usize, 0usize, 0usize);

            for (idx, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let event: GradingEvent = serde_json::from_str(&line).with_context(|| {
                    format!("{}:{}: invalid grading event", file.display(), idx + 1)
                })?;

                match runner.grade(&event) {
                    Ok(outcome) if outcome.duplicate => duplicates += 1,
                    Ok(_) => applied += 1,
                    Err(err) => {
                        failed += 1;
                        let err = anyhow::Error::from(err);
                        tracing::error!(
                            line = idx + 1,
                            card_id = event.card_id,
                            error = %format_args!("{err:#}"),
                            "grading event rejected"
                        );
                    }
                }
            }

            let summary = serde_json::json!({
                "applied": applied,
                "duplicates": duplicates,
                "failed": failed,
            });
            println!("{summary}");
        }
    }

    Ok(())
}

//! rangelease CLI: operator interface to a Postgres-backed lease queue.

use rangelease::config::{Config, SchedulerSettings};
use rangelease::model::{Disposition, QueueName, TaskId, now_score};
use rangelease::telemetry::{TelemetryConfig, init_telemetry};
use rangelease::{PgLeaseStore, RangeLeaseScheduler};
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rangelease", about = "Atomic range leases over a score-ordered queue")]
struct Cli {
    /// Queue to operate on (overrides config)
    #[arg(long, global = true)]
    queue: Option<String>,
    /// TOML settings file with a [scheduler] table
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a task, or move an existing one to a new ready time
    Enqueue {
        /// Task ID ("-" generates one)
        task: String,
        /// Ready time as a score (default: now)
        #[arg(long, conflicts_with = "delay", allow_negative_numbers = true)]
        at: Option<f64>,
        /// Ready time as seconds from now
        #[arg(long, allow_negative_numbers = true)]
        delay: Option<f64>,
    },
    /// Lease every due task and print their IDs
    Acquire {
        /// Upper bound of the due range (default: now)
        #[arg(long, allow_negative_numbers = true)]
        now: Option<f64>,
        /// Score step added to each leased task (default: config)
        #[arg(long)]
        increment: Option<f64>,
    },
    /// Finish a task: delete it, or put it back with --retry-at
    Release {
        task: String,
        /// Rescore instead of deleting
        #[arg(long, allow_negative_numbers = true)]
        retry_at: Option<f64>,
    },
    /// Move an existing task to a new ready time
    Requeue {
        task: String,
        #[arg(allow_negative_numbers = true)]
        ready_at: f64,
    },
    /// List entries by score
    List {
        #[arg(long, allow_negative_numbers = true)]
        min: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        max: Option<f64>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(ref path) = cli.config {
        config.scheduler = SchedulerSettings::load(path)?;
    }
    if let Some(name) = cli.queue {
        config.scheduler.queue = QueueName::new(name)?;
    }

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "rangelease".to_string(),
        default_level: config.log_level.clone(),
    })?;

    let store = PgLeaseStore::connect(config.database_url.expose_secret()).await?;
    store.migrate().await?;
    let scheduler = RangeLeaseScheduler::new(store.clone());

    let result = run(&scheduler, &config.scheduler, cli.command).await;
    store.close().await;
    result
}

async fn run(
    scheduler: &RangeLeaseScheduler<PgLeaseStore>,
    settings: &SchedulerSettings,
    command: Command,
) -> anyhow::Result<()> {
    let queue = &settings.queue;
    match command {
        Command::Enqueue { task, at, delay } => {
            let task = if task == "-" {
                TaskId::generate()
            } else {
                TaskId::new(task)?
            };
            let ready_at = match (at, delay) {
                (Some(at), _) => at,
                (None, Some(delay)) => now_score() + delay,
                (None, None) => now_score(),
            };
            scheduler.enqueue(queue, &task, ready_at).await?;
            println!("Enqueued: {task} @ {ready_at}");
        }
        Command::Acquire { now, increment } => {
            let now = now.unwrap_or_else(now_score);
            let increment = increment.unwrap_or(settings.increment_secs);
            let leased = scheduler.acquire_due(queue, now, increment).await?;
            if leased.is_empty() {
                println!("Nothing due.");
            }
            for task in &leased {
                println!("{task}");
            }
        }
        Command::Release { task, retry_at } => {
            let task = TaskId::new(task)?;
            let disposition = match retry_at {
                Some(score) => Disposition::RetryAt(score),
                None => Disposition::Complete,
            };
            let outcome = scheduler.release(queue, &task, disposition).await?;
            println!("Release {task}: {outcome}");
        }
        Command::Requeue { task, ready_at } => {
            let task = TaskId::new(task)?;
            let outcome = scheduler.requeue(queue, &task, ready_at).await?;
            println!("Requeue {task}: {outcome}");
        }
        Command::List { min, max, json } => {
            let entries = scheduler
                .pending(
                    queue,
                    min.unwrap_or(f64::NEG_INFINITY),
                    max.unwrap_or(f64::INFINITY),
                )
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            if entries.is_empty() {
                println!("No entries in {queue}.");
                return Ok(());
            }

            let now = now_score();
            println!("{:<40}  {:>20}  DUE", "TASK", "SCORE");
            println!("{}", "-".repeat(70));
            for entry in &entries {
                let due = if entry.score <= now { "yes" } else { "no" };
                println!("{:<40}  {:>20.3}  {}", entry.task, entry.score, due);
            }
            println!("\n{} entr(ies) in {queue}", entries.len());
        }
    }
    Ok(())
}

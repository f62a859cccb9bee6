//! # storesync
//!
//! Command-line entry point for the incremental synchronization engine.
//!
//! - `run` - Run sync tasks (all, in registry order, by default)
//! - `status` - Print the stored progress of every task
//! - `reset` - Rewind or clear one task's cursor
//! - `inspect` - Fetch one record and show how it transforms

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use storesync::{
    config::{AppConfig, ConfigLoader},
    db,
    records::EntityKind,
    repositories::SyncStateRepository,
    source::{Cursor, SourceClient, XiaoeClient},
    sync::{RunOptions, SyncOrchestrator, run_tasks, task},
    telemetry,
    transform::Transformed,
};
use tracing::{info, warn};

/// Incremental synchronization of store data into a relational database.
#[derive(Parser)]
#[command(name = "storesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run sync tasks
    Run {
        /// Task to run; repeat to select several (default: all)
        #[arg(short, long = "task")]
        tasks: Vec<String>,

        /// Ignore stored cursors and rescan the full lookback period
        #[arg(long)]
        full: bool,

        /// Lookback used when no cursor applies, in hours
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=876_600))]
        lookback_hours: Option<u64>,
    },

    /// Print the stored progress of every task
    Status,

    /// Reset a task's progress; the only way a watermark moves backwards
    Reset {
        task_id: String,

        /// New watermark (RFC 3339); omitted clears the cursor
        #[arg(long)]
        cursor: Option<String>,
    },

    /// Fetch one record by id and print its transformation
    Inspect {
        #[arg(value_enum)]
        entity: InspectEntity,
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InspectEntity {
    Order,
    Aftersale,
}

impl From<InspectEntity> for EntityKind {
    fn from(entity: InspectEntity) -> Self {
        match entity {
            InspectEntity::Order => EntityKind::Order,
            InspectEntity::Aftersale => EntityKind::Aftersale,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ConfigLoader::new().load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = telemetry::init_tracing(&config) {
        eprintln!("failed to initialize tracing: {err}");
        return ExitCode::FAILURE;
    }
    if let Ok(redacted) = config.redacted_json() {
        info!(profile = %config.profile, config = %redacted, "configuration loaded");
    }

    match execute(cli.command, config).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Commands, config: AppConfig) -> Result<ExitCode> {
    match command {
        Commands::Run {
            tasks,
            full,
            lookback_hours,
        } => run(config, tasks, full, lookback_hours).await,
        Commands::Status => status(&config).await,
        Commands::Reset { task_id, cursor } => reset(&config, &task_id, cursor.as_deref()).await,
        Commands::Inspect { entity, id } => inspect(config, entity.into(), &id).await,
    }
}

async fn run(
    config: AppConfig,
    requested: Vec<String>,
    full: bool,
    lookback_hours: Option<u64>,
) -> Result<ExitCode> {
    let tasks = task::select(&requested)
        .map_err(|unknown| anyhow!("unknown task(s): {}", unknown.join(", ")))?;

    let conn = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::migrate(&conn).await?;
    conn.close().await.context("closing migration pool")?;

    let source: Arc<dyn SourceClient> =
        Arc::new(XiaoeClient::new(&config.source).context("building source client")?);
    let orchestrator = SyncOrchestrator::from_config(&config, source);

    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping at the next page boundary");
            cancel.cancel();
        }
    });

    let options = RunOptions {
        full,
        lookback_override: lookback_hours
            .and_then(|hours| i64::try_from(hours).ok())
            .map(chrono::Duration::hours),
    };
    let summary = run_tasks(&config, &orchestrator, &tasks, &options).await;

    for report in &summary.reports {
        println!("{}", serde_json::to_string(report)?);
    }
    Ok(ExitCode::from(summary.exit_code() as u8))
}

async fn status(config: &AppConfig) -> Result<ExitCode> {
    let conn = db::init_pool(config)
        .await
        .context("initializing database connection pool")?;
    db::migrate(&conn).await?;

    let states = SyncStateRepository::new().list(&conn).await?;
    for state in &states {
        println!("{}", serde_json::to_string(state)?);
    }
    Ok(ExitCode::SUCCESS)
}

async fn reset(config: &AppConfig, task_id: &str, cursor: Option<&str>) -> Result<ExitCode> {
    if task::find(task_id).is_none() {
        bail!("unknown task: {task_id}");
    }
    let cursor = cursor
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|at| Cursor::from_timestamp(at.with_timezone(&Utc)))
                .with_context(|| format!("invalid cursor timestamp {raw:?}"))
        })
        .transpose()?;

    let conn = db::init_pool(config)
        .await
        .context("initializing database connection pool")?;
    db::migrate(&conn).await?;

    SyncStateRepository::new()
        .reset(&conn, task_id, cursor)
        .await
        .with_context(|| format!("resetting {task_id}"))?;
    println!("{task_id} reset");
    Ok(ExitCode::SUCCESS)
}

async fn inspect(config: AppConfig, entity: EntityKind, id: &str) -> Result<ExitCode> {
    let source = XiaoeClient::new(&config.source).context("building source client")?;
    let raw = source
        .fetch_detail(entity, id)
        .await
        .with_context(|| format!("fetching {entity} {id}"))?
        .ok_or_else(|| anyhow!("{entity} {id} not found"))?;

    let transformer = storesync::transform::Transformer::new(
        &config.source.platform,
        config.source.utc_offset(),
    );
    println!("{}", serde_json::to_string_pretty(&raw)?);
    match transformer.transform(entity, &raw) {
        Transformed::Accepted(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(ExitCode::SUCCESS)
        }
        Transformed::Rejected(rejection) => {
            println!("rejected: {}", rejection.reason);
            Ok(ExitCode::FAILURE)
        }
    }
}

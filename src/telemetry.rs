//! Global subscriber setup and run-scoped tracing spans.

use std::any::type_name_of_val;
use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;
use thiserror::Error;
use tracing::subscriber::{SetGlobalDefaultError, set_global_default};
use tracing::{Span, info_span};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, fmt, layer::Layer, layer::SubscriberExt};
use uuid::Uuid;

use crate::config::AppConfig;

/// Errors that can occur while initializing global telemetry.
#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

static TELEMETRY_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize global tracing exactly once.
///
/// `log` records emitted by sqlx and sea-orm are bridged into tracing by the
/// `LogTracer` installed here; the subscriber itself is set as the global
/// default without installing a second `log` logger.
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if TELEMETRY_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Ok(());
    }

    if let Err(err) = LogTracer::builder()
        .with_max_level(LevelFilter::Trace)
        .init()
    {
        // Another component may already have installed the bridge.
        let logger_type = type_name_of_val(log::logger());
        if !logger_type.contains("LogTracer") {
            eprintln!("warning: log bridge not installed ({err}); sqlx records will not be traced");
        }
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = match config.log_format.as_str() {
        "pretty" => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        _ => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(fmt_layer);
    if let Err(err) = set_global_default(subscriber) {
        TELEMETRY_INITIALIZED.store(false, Ordering::SeqCst);
        return Err(err.into());
    }

    Ok(())
}

/// Span covering one task run. Every event emitted inside carries the task
/// id and a fresh run id.
pub fn run_span(task_id: &str) -> (Span, Uuid) {
    let run_id = Uuid::new_v4();
    let span = info_span!("sync_run", task_id = %task_id, run_id = %run_id);
    (span, run_id)
}

//! # Sync Orchestrator
//!
//! Drives one task run through
//! `Init -> DetermineWindow -> FetchPage -> ApplyPage -> ... -> Finalize`.
//!
//! Each page's writes commit in their own transaction. The final state write
//! is a separate commit that is attempted on every exit path, so a run that
//! dies on page 3 still leaves pages 1 and 2 applied and a `failed` row
//! behind.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use super::fetch_loop::PaginatedFetchLoop;
use super::task::{Progress, TaskSpec};
use super::window::{self, SyncWindow, WindowPlanner};
use super::{Clock, SystemClock};
use crate::config::{AppConfig, SyncConfig};
use crate::error::{PersistenceError, SyncError};
use crate::loader::UpsertLoader;
use crate::records::CanonicalRecord;
use crate::repositories::{StateUpdate, SyncState, SyncStateRepository, SyncStatus};
use crate::retry::RetryPolicy;
use crate::source::{Cursor, Page, PageRequest, SourceClient};
use crate::telemetry::run_span;
use crate::transform::{Transformed, Transformer};

/// Per-invocation switches from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunOptions {
    /// Ignore stored watermarks and resume tokens.
    pub full: bool,
    /// Replaces the configured lookback where one applies.
    pub lookback_override: Option<chrono::Duration>,
}

/// What a finished run recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub task_id: String,
    pub run_id: Uuid,
    pub status: SyncStatus,
    pub message: Option<String>,
    pub window: Option<SyncWindow>,
    pub pages_fetched: u32,
    pub records_applied: u64,
    pub records_failed: u64,
    /// Cursor stored for the task once the run finished.
    pub cursor: Option<Cursor>,
}

/// Facts about a run fixed before the first page.
struct RunContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    timer: Instant,
    window: Option<SyncWindow>,
    prior_cursor: Option<Cursor>,
}

#[derive(Debug, Default)]
struct Tally {
    pages_fetched: u32,
    records_applied: u64,
    records_failed: u64,
    /// Resume token of the last committed page.
    committed_token: Option<Cursor>,
    /// Set when paging stopped at this limit with more data reported.
    page_limit: Option<u32>,
}

pub struct SyncOrchestrator {
    source: Arc<dyn SourceClient>,
    transformer: Transformer,
    loader: UpsertLoader,
    state: SyncStateRepository,
    retry: RetryPolicy,
    config: SyncConfig,
    planner: WindowPlanner,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn SourceClient>,
        transformer: Transformer,
        retry: RetryPolicy,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            transformer,
            loader: UpsertLoader::default(),
            state: SyncStateRepository::new(),
            retry,
            planner: WindowPlanner::from_config(&config),
            config,
            clock: Arc::new(SystemClock),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &AppConfig, source: Arc<dyn SourceClient>) -> Self {
        let transformer = Transformer::new(&config.source.platform, config.source.utc_offset());
        Self::new(
            source,
            transformer,
            RetryPolicy::from_config(&config.retry),
            config.sync.clone(),
        )
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_loader(mut self, loader: UpsertLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    pub fn source(&self) -> &dyn SourceClient {
        self.source.as_ref()
    }

    /// Run one task to completion and record its outcome.
    ///
    /// Never fails: every error ends up in the returned report and in the
    /// task's `sync_state` row.
    pub async fn run_task(
        &self,
        db: &DatabaseConnection,
        task: &TaskSpec,
        options: &RunOptions,
    ) -> RunReport {
        let (span, run_id) = run_span(task.id);
        self.execute(db, task, options, run_id)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        db: &DatabaseConnection,
        task: &TaskSpec,
        options: &RunOptions,
        run_id: Uuid,
    ) -> RunReport {
        let mut run = RunContext {
            run_id,
            started_at: self.clock.now(),
            timer: Instant::now(),
            window: None,
            prior_cursor: None,
        };
        info!(
            entity = %task.entity,
            progress = task.progress.as_str(),
            full = options.full,
            "sync run started"
        );

        let prior = match self.begin(db, task, run.started_at).await {
            Ok(prior) => prior,
            Err(err) => return self.finalize(db, task, run, Tally::default(), Err(err)).await,
        };
        run.prior_cursor = prior.and_then(|state| state.cursor);

        let (window, start_cursor) =
            self.determine_window(task, options, run.prior_cursor.as_ref(), run.started_at);
        run.window = window;
        let request = PageRequest {
            entity: task.entity,
            window,
            cursor: start_cursor,
            page_size: self.config.page_size,
        };
        let mut pages =
            PaginatedFetchLoop::new(self.source.as_ref(), &self.retry, request, self.config.max_pages)
                .with_page_delay(Duration::from_millis(self.config.page_delay_ms))
                .with_cancellation(self.cancel.clone());

        let mut tally = Tally::default();
        let outcome = self.page_through(db, task, &mut pages, &mut tally).await;
        tally.pages_fetched = pages.pages_fetched();
        tally.page_limit = pages.truncated().then_some(self.config.max_pages);

        self.finalize(db, task, run, tally, outcome).await
    }

    /// Read prior progress and mark the task running.
    async fn begin(
        &self,
        db: &DatabaseConnection,
        task: &TaskSpec,
        started_at: DateTime<Utc>,
    ) -> Result<Option<SyncState>, SyncError> {
        let prior = self.state.get(db, task.id).await.map_err(SyncError::State)?;
        self.state
            .save(db, task.id, StateUpdate::running(started_at))
            .await
            .map_err(SyncError::State)?;
        Ok(prior)
    }

    fn determine_window(
        &self,
        task: &TaskSpec,
        options: &RunOptions,
        prior: Option<&Cursor>,
        now: DateTime<Utc>,
    ) -> (Option<SyncWindow>, Option<Cursor>) {
        match task.progress {
            Progress::Watermark => {
                let watermark = watermark_of(prior);
                let window = self.planner.watermark(
                    watermark,
                    now,
                    options.full,
                    options.lookback_override,
                );
                info!(start = %window.start, end = %window.end, "window determined");
                (Some(window), None)
            }
            Progress::Rescan => {
                let window = self.planner.rescan(now, options.lookback_override);
                info!(start = %window.start, end = %window.end, "rescan window determined");
                (Some(window), None)
            }
            Progress::Resume if !options.full => (None, prior.cloned()),
            Progress::Resume | Progress::Snapshot => (None, None),
        }
    }

    async fn page_through(
        &self,
        db: &DatabaseConnection,
        task: &TaskSpec,
        pages: &mut PaginatedFetchLoop<'_>,
        tally: &mut Tally,
    ) -> Result<(), SyncError> {
        while let Some(page) = pages.next_page().await? {
            let page_number = pages.pages_fetched();
            let (records, rejected) = self.transform_page(task, &page);
            let token = match task.progress {
                Progress::Resume => page.next_cursor.as_ref(),
                _ => None,
            };

            let applied = self.apply_page(db, task, records, token).await?;

            tally.records_applied += applied;
            tally.records_failed += rejected;
            if let Some(token) = token {
                tally.committed_token = Some(token.clone());
            }
            counter!("sync_records_applied_total", "task" => task.id).increment(applied);
            counter!("sync_records_rejected_total", "task" => task.id).increment(rejected);
            info!(
                page = page_number,
                records_ok = applied,
                records_failed = rejected,
                "page applied"
            );
        }
        Ok(())
    }

    fn transform_page(&self, task: &TaskSpec, page: &Page) -> (Vec<CanonicalRecord>, u64) {
        let mut records = Vec::with_capacity(page.items.len());
        let mut rejected = 0;
        for raw in &page.items {
            match self.transformer.transform(task.entity, raw) {
                Transformed::Accepted(record) => records.push(record),
                Transformed::Rejected(rejection) => {
                    rejected += 1;
                    warn!(
                        entity = %rejection.entity,
                        record_id = rejection.record_id.as_deref().unwrap_or("<unknown>"),
                        reason = %rejection.reason,
                        "record rejected"
                    );
                }
            }
        }
        (records, rejected)
    }

    /// Write one page and, for resumable tasks, its token, as one commit.
    async fn apply_page(
        &self,
        db: &DatabaseConnection,
        task: &TaskSpec,
        records: Vec<CanonicalRecord>,
        token: Option<&Cursor>,
    ) -> Result<u64, SyncError> {
        let txn = db.begin().await.map_err(PersistenceError::Transaction)?;
        let counts = self.loader.apply_records(&txn, records).await?;
        if let Some(token) = token {
            self.state
                .save_cursor(&txn, task.id, token)
                .await
                .map_err(SyncError::State)?;
        }
        txn.commit().await.map_err(PersistenceError::Transaction)?;
        Ok(counts.succeeded)
    }

    async fn finalize(
        &self,
        db: &DatabaseConnection,
        task: &TaskSpec,
        run: RunContext,
        tally: Tally,
        outcome: Result<(), SyncError>,
    ) -> RunReport {
        let (status, message) = match &outcome {
            Err(err) => (SyncStatus::Failed, Some(err.to_string())),
            Ok(()) if tally.records_failed > 0 && tally.records_applied == 0 => (
                SyncStatus::Failed,
                Some(format!("all {} records were rejected", tally.records_failed)),
            ),
            Ok(()) if tally.records_failed > 0 => (
                SyncStatus::PartialSuccess,
                Some(format!(
                    "{} of {} records rejected",
                    tally.records_failed,
                    tally.records_failed + tally.records_applied
                )),
            ),
            Ok(()) => (SyncStatus::Success, None),
        };
        let message = match (outcome.is_ok(), tally.page_limit) {
            (true, Some(limit)) => {
                let note = format!("stopped at page limit of {limit}; later pages were not fetched");
                Some(match message {
                    Some(message) => format!("{message}; {note}"),
                    None => note,
                })
            }
            _ => message,
        };

        let cursor = match task.progress {
            Progress::Watermark if status.advances_cursor() && tally.pages_fetched > 0 => run
                .window
                .map(|window| window::advance(watermark_of(run.prior_cursor.as_ref()), window.end))
                .map(Cursor::from_timestamp),
            Progress::Resume => tally.committed_token.clone(),
            _ => None,
        };

        let update = StateUpdate {
            status,
            message: message.clone(),
            started_at: Some(run.started_at),
            ended_at: Some(self.clock.now()),
            cursor: cursor.clone(),
            pages_fetched: tally.pages_fetched,
            records_applied: tally.records_applied,
            records_failed: tally.records_failed,
        };
        if let Err(err) = self.state.save(db, task.id, update).await {
            error!(error = %err, status = %status, "failed to record sync state");
        }

        let elapsed = run.timer.elapsed();
        counter!("sync_runs_total", "task" => task.id, "status" => status.as_str()).increment(1);
        histogram!("sync_run_duration_seconds", "task" => task.id).record(elapsed.as_secs_f64());

        match &outcome {
            Err(err) => error!(
                error = %err,
                pages = tally.pages_fetched,
                records_ok = tally.records_applied,
                elapsed_ms = elapsed.as_millis() as u64,
                "sync run failed"
            ),
            Ok(()) => info!(
                status = %status,
                pages = tally.pages_fetched,
                records_ok = tally.records_applied,
                records_failed = tally.records_failed,
                elapsed_ms = elapsed.as_millis() as u64,
                "sync run finished"
            ),
        }

        RunReport {
            task_id: task.id.to_string(),
            run_id: run.run_id,
            status,
            message,
            window: run.window,
            pages_fetched: tally.pages_fetched,
            records_applied: tally.records_applied,
            records_failed: tally.records_failed,
            cursor: cursor.or(run.prior_cursor),
        }
    }
}

fn watermark_of(cursor: Option<&Cursor>) -> Option<DateTime<Utc>> {
    let cursor = cursor?;
    let parsed = cursor.as_timestamp();
    if parsed.is_none() {
        warn!(cursor = %cursor.as_json(), "stored cursor is not a timestamp, ignoring it");
    }
    parsed
}

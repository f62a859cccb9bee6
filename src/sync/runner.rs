//! Sequential execution of selected tasks.

use tracing::{error, info, warn};
use uuid::Uuid;

use super::orchestrator::{RunOptions, RunReport, SyncOrchestrator};
use super::task::TaskSpec;
use crate::config::AppConfig;
use crate::db;
use crate::repositories::SyncStatus;

/// Reports of every task that was started, in execution order.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<RunReport>,
}

impl RunSummary {
    pub fn any_failed(&self) -> bool {
        self.reports
            .iter()
            .any(|report| report.status == SyncStatus::Failed)
    }

    /// Process exit code: 1 if any task finalized `failed`.
    pub fn exit_code(&self) -> i32 {
        if self.any_failed() { 1 } else { 0 }
    }
}

/// Run `tasks` one after another. A failed task is recorded and the next
/// one still runs; once cancellation is requested no further task starts.
///
/// Each task gets its own connection pool, closed when its run ends.
pub async fn run_tasks(
    config: &AppConfig,
    orchestrator: &SyncOrchestrator,
    tasks: &[TaskSpec],
    options: &RunOptions,
) -> RunSummary {
    let cancel = orchestrator.cancellation_token();
    let mut summary = RunSummary::default();

    for task in tasks {
        if cancel.is_cancelled() {
            warn!(task_id = task.id, "cancellation requested, skipping remaining tasks");
            break;
        }

        let report = match db::init_pool(config).await {
            Ok(conn) => {
                let report = orchestrator.run_task(&conn, task, options).await;
                if let Err(err) = conn.close().await {
                    warn!(task_id = task.id, error = %err, "failed to close database pool");
                }
                report
            }
            Err(err) => {
                error!(task_id = task.id, error = %err, "database unavailable, task not run");
                not_started(task, format!("database unavailable: {err:#}"))
            }
        };

        info!(task_id = task.id, status = %report.status, "task completed");
        summary.reports.push(report);
    }

    summary
}

fn not_started(task: &TaskSpec, message: String) -> RunReport {
    RunReport {
        task_id: task.id.to_string(),
        run_id: Uuid::new_v4(),
        status: SyncStatus::Failed,
        message: Some(message),
        window: None,
        pages_fetched: 0,
        records_applied: 0,
        records_failed: 0,
        cursor: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(status: SyncStatus) -> RunReport {
        RunReport {
            status,
            ..not_started(&crate::sync::task::REGISTRY[0], String::new())
        }
    }

    #[test]
    fn exit_code_reflects_any_failed_task() {
        let ok = RunSummary {
            reports: vec![report(SyncStatus::Success), report(SyncStatus::PartialSuccess)],
        };
        assert!(!ok.any_failed());
        assert_eq!(ok.exit_code(), 0);

        let failed = RunSummary {
            reports: vec![report(SyncStatus::Success), report(SyncStatus::Failed)],
        };
        assert!(failed.any_failed());
        assert_eq!(failed.exit_code(), 1);
    }

    #[test]
    fn empty_summary_exits_cleanly() {
        assert_eq!(RunSummary::default().exit_code(), 0);
    }
}

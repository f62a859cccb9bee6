//! Multi-task runs against a file-backed SQLite database.

mod test_utils;

use anyhow::Result;
use sea_orm::{EntityTrait, PaginatorTrait};
use tempfile::TempDir;

use storesync::config::AppConfig;
use storesync::db;
use storesync::models::product;
use storesync::repositories::{SyncStateRepository, SyncStatus};
use storesync::source::SourceError;
use storesync::sync::task;
use storesync::sync::{RunOptions, run_tasks};

use test_utils::*;

fn file_config(dir: &TempDir) -> AppConfig {
    AppConfig {
        database_url: format!("sqlite://{}?mode=rwc", dir.path().join("sync.db").display()),
        db_max_connections: 1,
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn failed_task_does_not_stop_the_next_one() -> Result<()> {
    let dir = TempDir::new()?;
    let config = file_config(&dir);
    let conn = db::init_pool(&config).await?;
    db::migrate(&conn).await?;

    let source = ScriptedSource::new(vec![
        Err(SourceError::timeout("order.list")),
        Err(SourceError::timeout("order.list")),
        Err(SourceError::timeout("order.list")),
        Ok(page(vec![raw_product("p_1"), raw_product("p_2")], None)),
    ]);
    let tasks = task::select(&[
        task::ORDERS_INCREMENTAL.to_string(),
        task::PRODUCTS.to_string(),
    ])
    .unwrap();

    let summary = run_tasks(
        &config,
        &orchestrator(source, utc(2024, 1, 11)),
        &tasks,
        &RunOptions::default(),
    )
    .await;

    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.reports[0].task_id, task::ORDERS_INCREMENTAL);
    assert_eq!(summary.reports[0].status, SyncStatus::Failed);
    assert_eq!(summary.reports[1].status, SyncStatus::Success);
    assert!(summary.any_failed());
    assert_eq!(summary.exit_code(), 1);

    let states = SyncStateRepository::new().list(&conn).await?;
    assert_eq!(states.len(), 2);
    assert_eq!(product::Entity::find().count(&conn).await?, 2);
    Ok(())
}

#[tokio::test]
async fn cancelled_runner_starts_no_task() -> Result<()> {
    let dir = TempDir::new()?;
    let config = file_config(&dir);

    let source = ScriptedSource::new(Vec::new());
    let orchestrator = orchestrator(source.clone(), utc(2024, 1, 11));
    orchestrator.cancellation_token().cancel();

    let summary = run_tasks(&config, &orchestrator, &task::REGISTRY, &RunOptions::default()).await;

    assert!(summary.reports.is_empty());
    assert_eq!(summary.exit_code(), 0);
    assert!(source.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn unreachable_database_yields_failed_report() -> Result<()> {
    let dir = TempDir::new()?;
    let config = AppConfig {
        database_url: format!(
            "sqlite://{}",
            dir.path().join("missing").join("sync.db").display()
        ),
        ..AppConfig::default()
    };

    let source = ScriptedSource::new(Vec::new());
    let summary = run_tasks(
        &config,
        &orchestrator(source.clone(), utc(2024, 1, 11)),
        &[task::find(task::USERS).unwrap()],
        &RunOptions::default(),
    )
    .await;

    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].status, SyncStatus::Failed);
    assert!(
        summary.reports[0]
            .message
            .as_deref()
            .unwrap_or_default()
            .starts_with("database unavailable")
    );
    assert!(source.requests().is_empty());
    Ok(())
}

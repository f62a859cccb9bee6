//! Binary-level behavior: fail-fast configuration and state maintenance.

use assert_cmd::Command;
use tempfile::TempDir;

fn storesync(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("storesync").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("STORESYNC_PROFILE")
        .env_remove("STORESYNC_DATABASE_URL")
        .env_remove("STORESYNC_SOURCE_APP_ID")
        .env_remove("STORESYNC_SOURCE_CLIENT_ID")
        .env_remove("STORESYNC_SOURCE_SECRET_KEY");
    cmd
}

fn configured(dir: &TempDir) -> Command {
    let database = dir.path().join("state.db");
    let mut cmd = storesync(dir);
    cmd.env(
        "STORESYNC_DATABASE_URL",
        format!("sqlite://{}?mode=rwc", database.display()),
    )
    .env("STORESYNC_SOURCE_APP_ID", "app_test")
    .env("STORESYNC_SOURCE_CLIENT_ID", "client_test")
    .env("STORESYNC_SOURCE_SECRET_KEY", "secret_test")
    .env("STORESYNC_LOG_LEVEL", "warn");
    cmd
}

#[test]
fn missing_configuration_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    let output = storesync(&dir).arg("status").assert().failure().code(1);

    let stderr = String::from_utf8_lossy(&output.get_output().stderr).to_string();
    assert!(stderr.contains("configuration error"), "stderr: {stderr}");
    assert!(stderr.contains("STORESYNC_DATABASE_URL"), "stderr: {stderr}");
}

#[test]
fn unknown_task_is_refused_before_running_anything() {
    let dir = TempDir::new().unwrap();
    let output = configured(&dir)
        .args(["run", "--task", "orders_incremental", "--task", "refunds"])
        .assert()
        .failure()
        .code(1);

    let stderr = String::from_utf8_lossy(&output.get_output().stderr).to_string();
    assert!(stderr.contains("unknown task(s): refunds"), "stderr: {stderr}");
}

#[test]
fn reset_then_status_shows_pending_task() {
    let dir = TempDir::new().unwrap();

    let reset = configured(&dir)
        .args(["reset", "orders_incremental", "--cursor", "2024-01-01T00:00:00Z"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&reset.get_output().stdout).to_string();
    assert!(stdout.contains("orders_incremental reset"));

    let status = configured(&dir).arg("status").assert().success();
    let stdout = String::from_utf8_lossy(&status.get_output().stdout).to_string();
    assert!(stdout.contains("\"task_id\":\"orders_incremental\""), "stdout: {stdout}");
    assert!(stdout.contains("\"status\":\"pending\""), "stdout: {stdout}");
    assert!(stdout.contains("2024-01-01T00:00:00+00:00"), "stdout: {stdout}");
}

#[test]
fn reset_rejects_malformed_cursor() {
    let dir = TempDir::new().unwrap();
    configured(&dir)
        .args(["reset", "orders_incremental", "--cursor", "yesterday"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn status_on_fresh_database_starts_cleanly() {
    let dir = TempDir::new().unwrap();
    let output = configured(&dir).arg("status").assert().success();

    let stderr = String::from_utf8_lossy(&output.get_output().stderr).to_string();
    assert!(!stderr.contains("failed to initialize tracing"), "stderr: {stderr}");
    assert!(output.get_output().stdout.is_empty());
    assert!(dir.path().join("state.db").exists());
}

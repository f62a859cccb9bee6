//! # SyncState Repository
//!
//! Durable per-task progress. The cursor is stored and returned verbatim;
//! nothing here looks inside it. The store does not serialize writers: one
//! run per `task_id` at a time is the caller's responsibility.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel, QueryOrder, Set,
};
use serde::Serialize;

use crate::models::sync_state::{ActiveModel, Column, Entity, Model};
use crate::source::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Running,
    Success,
    PartialSuccess,
    Failed,
}

impl SyncStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Running => "running",
            SyncStatus::Success => "success",
            SyncStatus::PartialSuccess => "partial_success",
            SyncStatus::Failed => "failed",
        }
    }

    /// Whether a run ending in this status may move a watermark.
    pub const fn advances_cursor(self) -> bool {
        matches!(self, SyncStatus::Success | SyncStatus::PartialSuccess)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = DbErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncStatus::Pending),
            "running" => Ok(SyncStatus::Running),
            "success" => Ok(SyncStatus::Success),
            "partial_success" => Ok(SyncStatus::PartialSuccess),
            "failed" => Ok(SyncStatus::Failed),
            other => Err(DbErr::Type(format!("unknown sync status '{other}'"))),
        }
    }
}

/// Stored progress of one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncState {
    pub task_id: String,
    pub cursor: Option<Cursor>,
    pub status: SyncStatus,
    pub message: Option<String>,
    pub run_started_at: Option<DateTime<Utc>>,
    pub run_ended_at: Option<DateTime<Utc>>,
    pub pages_fetched: u32,
    pub records_applied: u64,
    pub records_failed: u64,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Model> for SyncState {
    type Error = DbErr;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            status: model.status.parse()?,
            task_id: model.task_id,
            cursor: model.cursor.map(Cursor::from_json),
            message: model.message,
            run_started_at: model.run_started_at.map(|at| at.with_timezone(&Utc)),
            run_ended_at: model.run_ended_at.map(|at| at.with_timezone(&Utc)),
            pages_fetched: u32::try_from(model.pages_fetched).unwrap_or_default(),
            records_applied: u64::try_from(model.records_applied).unwrap_or_default(),
            records_failed: u64::try_from(model.records_failed).unwrap_or_default(),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

/// Mutable fields written by [`SyncStateRepository::save`].
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    pub status: SyncStatus,
    pub message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// `None` keeps whatever cursor is stored.
    pub cursor: Option<Cursor>,
    pub pages_fetched: u32,
    pub records_applied: u64,
    pub records_failed: u64,
}

impl StateUpdate {
    pub fn running(started_at: DateTime<Utc>) -> Self {
        Self {
            status: SyncStatus::Running,
            message: None,
            started_at: Some(started_at),
            ended_at: None,
            cursor: None,
            pages_fetched: 0,
            records_applied: 0,
            records_failed: 0,
        }
    }
}

async fn write<C: ConnectionTrait>(conn: &C, model: ActiveModel, is_new: bool) -> Result<(), DbErr> {
    if is_new {
        model.insert(conn).await?;
    } else {
        model.update(conn).await?;
    }
    Ok(())
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Repository for the `sync_state` table.
///
/// Every method takes the connection to run on, so progress can be written
/// either on its own or inside a page transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncStateRepository;

impl SyncStateRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn get<C: ConnectionTrait>(&self, conn: &C, task_id: &str) -> Result<Option<SyncState>, DbErr> {
        Entity::find_by_id(task_id.to_string())
            .one(conn)
            .await?
            .map(SyncState::try_from)
            .transpose()
    }

    /// Create the row if absent, otherwise overwrite its mutable fields.
    pub async fn save<C: ConnectionTrait>(
        &self,
        conn: &C,
        task_id: &str,
        update: StateUpdate,
    ) -> Result<(), DbErr> {
        let now = Utc::now().fixed_offset();
        let existing = Entity::find_by_id(task_id.to_string()).one(conn).await?;

        let is_new = existing.is_none();
        let mut model = match existing {
            Some(model) => model.into_active_model(),
            None => ActiveModel {
                task_id: Set(task_id.to_string()),
                cursor: Set(None),
                created_at: Set(now),
                ..Default::default()
            },
        };

        if let Some(cursor) = update.cursor {
            model.cursor = Set(Some(cursor.into()));
        }
        model.status = Set(update.status.as_str().to_string());
        model.message = Set(update.message);
        model.run_started_at = Set(update.started_at.map(|at| at.fixed_offset()));
        model.run_ended_at = Set(update.ended_at.map(|at| at.fixed_offset()));
        model.pages_fetched = Set(i32::try_from(update.pages_fetched).unwrap_or(i32::MAX));
        model.records_applied = Set(clamp_i64(update.records_applied));
        model.records_failed = Set(clamp_i64(update.records_failed));
        model.updated_at = Set(now);

        write(conn, model, is_new).await?;
        tracing::debug!(task_id, status = %update.status, "sync state saved");
        Ok(())
    }

    /// Record mid-run progress for a task whose row already exists.
    pub async fn save_cursor<C: ConnectionTrait>(
        &self,
        conn: &C,
        task_id: &str,
        cursor: &Cursor,
    ) -> Result<(), DbErr> {
        let model = ActiveModel {
            task_id: Set(task_id.to_string()),
            cursor: Set(Some(cursor.as_json().clone())),
            updated_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        };
        model.update(conn).await?;
        Ok(())
    }

    /// Manually rewind (or clear) a task's cursor. The only path that may
    /// move a watermark backwards.
    pub async fn reset<C: ConnectionTrait>(
        &self,
        conn: &C,
        task_id: &str,
        cursor: Option<Cursor>,
    ) -> Result<(), DbErr> {
        let now = Utc::now().fixed_offset();
        let existing = Entity::find_by_id(task_id.to_string()).one(conn).await?;
        let is_new = existing.is_none();
        let mut model = match existing {
            Some(model) => model.into_active_model(),
            None => ActiveModel {
                task_id: Set(task_id.to_string()),
                created_at: Set(now),
                run_started_at: Set(None),
                run_ended_at: Set(None),
                ..Default::default()
            },
        };

        model.cursor = Set(cursor.map(Into::into));
        model.status = Set(SyncStatus::Pending.as_str().to_string());
        model.message = Set(Some("manual reset".to_string()));
        model.pages_fetched = Set(0);
        model.records_applied = Set(0);
        model.records_failed = Set(0);
        model.updated_at = Set(now);
        write(conn, model, is_new).await?;

        tracing::info!(task_id, "sync state reset");
        Ok(())
    }

    pub async fn list<C: ConnectionTrait>(&self, conn: &C) -> Result<Vec<SyncState>, DbErr> {
        Entity::find()
            .order_by_asc(Column::TaskId)
            .all(conn)
            .await?
            .into_iter()
            .map(SyncState::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_storage_text() {
        for status in [
            SyncStatus::Pending,
            SyncStatus::Running,
            SyncStatus::Success,
            SyncStatus::PartialSuccess,
            SyncStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<SyncStatus>().unwrap(), status);
        }
        assert!("done".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn only_successful_outcomes_advance() {
        assert!(SyncStatus::Success.advances_cursor());
        assert!(SyncStatus::PartialSuccess.advances_cursor());
        assert!(!SyncStatus::Failed.advances_cursor());
    }
}

//! SyncState entity model
//!
//! One row per synchronization task: the opaque cursor the task resumes
//! from and the outcome of its most recent run.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_state")]
pub struct Model {
    /// Stable task name, e.g. `orders_incremental`
    #[sea_orm(primary_key, auto_increment = false)]
    pub task_id: String,

    /// Opaque progress marker, stored and returned verbatim
    #[sea_orm(column_type = "Json", nullable)]
    pub cursor: Option<JsonValue>,

    /// One of pending, running, success, partial_success, failed
    pub status: String,

    /// Diagnostic message for the most recent run
    #[sea_orm(column_type = "Text", nullable)]
    pub message: Option<String>,

    pub run_started_at: Option<DateTimeWithTimeZone>,

    pub run_ended_at: Option<DateTimeWithTimeZone>,

    pub pages_fetched: i32,

    pub records_applied: i64,

    pub records_failed: i64,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

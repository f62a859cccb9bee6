//! # Error Handling
//!
//! Error taxonomy for synchronization runs. Per-record problems are
//! [`ValidationError`]s and never leave the page they occur in; everything
//! else surfaces as a [`SyncError`] that aborts the current task run.

use sea_orm::{DbErr, RuntimeErr};
use thiserror::Error;

use crate::config::ConfigError;
use crate::records::{EntityKind, ParentKey};
use crate::retry::RetryError;
use crate::source::SourceError;

/// Why a raw record was rejected by the transformer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("payload is not a valid {entity} record: {details}")]
    Malformed { entity: EntityKind, details: String },
    #[error("missing natural key field `{field}`")]
    MissingKey { field: &'static str },
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("field `{field}` has an unrecognized timestamp {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("field `{field}` is not an integral minor-unit amount: {value:?}")]
    InvalidAmount { field: &'static str, value: String },
    #[error("field `{field}` is not an integer: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("field `{field}` is {len} characters, longer than its column width {max}")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },
    #[error("line {line}: {source}")]
    InvalidChild {
        line: usize,
        source: Box<ValidationError>,
    },
}

/// Constraint class of a failed write, when the database reports one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    NotNull,
}

/// Failure writing to the destination store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("writing {table} failed: {source}")]
    Write {
        table: &'static str,
        constraint: Option<ConstraintKind>,
        source: DbErr,
    },
    #[error("transaction failed: {0}")]
    Transaction(#[source] DbErr),
    #[error("child row of {child} cannot be written under parent {parent}")]
    ParentMismatch { parent: ParentKey, child: ParentKey },
}

impl PersistenceError {
    pub fn write(table: &'static str, source: DbErr) -> Self {
        Self::Write {
            table,
            constraint: constraint_kind(&source),
            source,
        }
    }
}

/// Run-level failure. Every variant aborts the task run it occurs in.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("authentication failed: {0}")]
    Authentication(SourceError),
    #[error("source request failed: {0}")]
    Source(SourceError),
    #[error("source request failed after {attempts} attempts: {last}")]
    RetryExhausted { attempts: u32, last: SourceError },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("sync state unavailable: {0}")]
    State(#[source] DbErr),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("run cancelled before page {page}")]
    Cancelled { page: u32 },
}

impl From<RetryError<SourceError>> for SyncError {
    fn from(err: RetryError<SourceError>) -> Self {
        match err {
            RetryError::Terminal(source @ SourceError::Authentication { .. }) => {
                SyncError::Authentication(source)
            }
            RetryError::Terminal(source) => SyncError::Source(source),
            RetryError::Exhausted { attempts, last } => SyncError::RetryExhausted { attempts, last },
        }
    }
}

/// Classify the constraint behind a failed statement, across the backends
/// the engine runs on.
pub fn constraint_kind(error: &DbErr) -> Option<ConstraintKind> {
    const PG_UNIQUE: &str = "23505";
    const PG_FOREIGN_KEY: &str = "23503";
    const PG_NOT_NULL: &str = "23502";
    const SQLITE_UNIQUE_CODES: &[&str] = &["1555", "2067"];
    const SQLITE_FOREIGN_KEY: &str = "787";
    const SQLITE_NOT_NULL: &str = "1299";

    let sqlx_err = match error {
        DbErr::Query(RuntimeErr::SqlxError(err)) | DbErr::Exec(RuntimeErr::SqlxError(err)) => err,
        _ => return None,
    };
    let db_error = sqlx_err.as_database_error()?;

    if db_error.is_unique_violation() {
        return Some(ConstraintKind::Unique);
    }
    if db_error.is_foreign_key_violation() {
        return Some(ConstraintKind::ForeignKey);
    }

    let code = db_error.code()?;
    match code.as_ref() {
        PG_UNIQUE => Some(ConstraintKind::Unique),
        PG_FOREIGN_KEY | SQLITE_FOREIGN_KEY => Some(ConstraintKind::ForeignKey),
        PG_NOT_NULL | SQLITE_NOT_NULL => Some(ConstraintKind::NotNull),
        other if SQLITE_UNIQUE_CODES.contains(&other) => Some(ConstraintKind::Unique),
        _ => None,
    }
}

//! Source fetch collaborator.
//!
//! Defines the interface the engine pages through, the opaque [`Cursor`]
//! it resumes from, and the error classes every source implementation must
//! report failures as.

pub mod token;
pub mod xiaoe;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::records::EntityKind;
use crate::retry::{RetryClass, Retryable};
use crate::sync::window::SyncWindow;

pub use xiaoe::XiaoeClient;

/// Opaque progress marker.
///
/// Wraps whatever JSON value the engine or the source uses to resume: a
/// timestamp watermark, a page number, or a source-issued token. The state
/// store never looks inside it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Cursor(pub Value);

impl Cursor {
    /// Construct a cursor from any JSON value.
    pub fn from_json(value: Value) -> Self {
        Self(value)
    }

    /// Timestamp watermark, stored as an RFC 3339 UTC string.
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self(Value::String(at.to_rfc3339()))
    }

    pub fn from_page(page: u64) -> Self {
        Self(Value::from(page))
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    /// Interpret the cursor as a timestamp watermark.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        self.0
            .as_str()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc))
    }

    /// Interpret the cursor as a page number.
    pub fn as_page(&self) -> Option<u64> {
        match &self.0 {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl From<Cursor> for Value {
    fn from(cursor: Cursor) -> Self {
        cursor.0
    }
}

impl From<Value> for Cursor {
    fn from(value: Value) -> Self {
        Cursor::from_json(value)
    }
}

/// Filter for one page fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub entity: EntityKind,
    /// Time window to restrict the listing to, when the task is windowed.
    pub window: Option<SyncWindow>,
    /// Position to fetch from; `None` means the first page.
    pub cursor: Option<Cursor>,
    pub page_size: u32,
}

impl PageRequest {
    pub fn with_cursor(&self, cursor: Option<Cursor>) -> Self {
        Self {
            cursor,
            ..self.clone()
        }
    }
}

/// One page of raw source records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    /// Cursor for the following page, if the source supplied one.
    pub next_cursor: Option<Cursor>,
    pub has_more: bool,
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    Network,
    Timeout,
    RateLimited { retry_after_secs: Option<u64> },
    Server { status: u16 },
}

impl std::fmt::Display for TransientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransientKind::Network => write!(f, "network error"),
            TransientKind::Timeout => write!(f, "timeout"),
            TransientKind::RateLimited {
                retry_after_secs: Some(after),
            } => write!(f, "rate limited (retry after {after}s)"),
            TransientKind::RateLimited { .. } => write!(f, "rate limited"),
            TransientKind::Server { status } => write!(f, "server error {status}"),
        }
    }
}

/// How a source request failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// Credential rejected or token invalid. Never retried.
    #[error("authentication rejected: {details}")]
    Authentication { details: String, code: Option<i64> },
    #[error("{kind} during {operation}: {details}")]
    Transient {
        kind: TransientKind,
        operation: String,
        details: String,
    },
    /// Envelope delivered with a non-zero application code.
    #[error("{operation} returned code {code}: {message}")]
    Api {
        code: i64,
        operation: String,
        message: String,
    },
    #[error("malformed response from {operation}: {details}")]
    Malformed { operation: String, details: String },
    #[error("{entity} records do not support {operation}")]
    Unsupported {
        entity: EntityKind,
        operation: &'static str,
    },
}

impl SourceError {
    pub fn authentication<S: Into<String>>(details: S, code: Option<i64>) -> Self {
        Self::Authentication {
            details: details.into(),
            code,
        }
    }

    pub fn transient<S: Into<String>>(kind: TransientKind, operation: &str, details: S) -> Self {
        Self::Transient {
            kind,
            operation: operation.to_string(),
            details: details.into(),
        }
    }

    pub fn timeout(operation: &str) -> Self {
        Self::transient(TransientKind::Timeout, operation, "request timed out")
    }

    pub fn malformed<S: Into<String>>(operation: &str, details: S) -> Self {
        Self::Malformed {
            operation: operation.to_string(),
            details: details.into(),
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, SourceError::Authentication { .. })
    }
}

impl Retryable for SourceError {
    fn retry_class(&self) -> RetryClass {
        match self {
            SourceError::Authentication { .. } | SourceError::Unsupported { .. } => {
                RetryClass::Terminal
            }
            SourceError::Transient { .. } | SourceError::Api { .. } | SourceError::Malformed { .. } => {
                RetryClass::Retriable
            }
        }
    }
}

/// A paginated source of raw records.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Fetch one page of `request.entity` records.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page, SourceError>;

    /// Fetch the full payload of a single record, `None` when the source
    /// does not know the id.
    async fn fetch_detail(&self, entity: EntityKind, id: &str) -> Result<Option<Value>, SourceError> {
        let _ = id;
        Err(SourceError::Unsupported {
            entity,
            operation: "detail lookup",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn timestamp_cursor_round_trips_through_json() {
        let at = Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap();
        let cursor = Cursor::from_timestamp(at);
        let stored = serde_json::to_value(&cursor).unwrap();
        let restored: Cursor = serde_json::from_value(stored).unwrap();
        assert_eq!(restored.as_timestamp(), Some(at));
    }

    #[test]
    fn opaque_cursor_is_not_a_timestamp() {
        let cursor = Cursor::from_json(json!({"es_skip": [1, "u_9"]}));
        assert_eq!(cursor.as_timestamp(), None);
        assert_eq!(cursor.as_page(), None);
        assert_eq!(Cursor::from_page(4).as_page(), Some(4));
    }

    #[test]
    fn only_authentication_and_unsupported_are_terminal() {
        assert_eq!(
            SourceError::authentication("bad secret", Some(40001)).retry_class(),
            RetryClass::Terminal
        );
        assert_eq!(SourceError::timeout("order list").retry_class(), RetryClass::Retriable);
        assert_eq!(
            SourceError::transient(
                TransientKind::RateLimited {
                    retry_after_secs: Some(2)
                },
                "user list",
                "slow down"
            )
            .retry_class(),
            RetryClass::Retriable
        );
        assert_eq!(
            SourceError::Api {
                code: 50000,
                operation: "goods list".to_string(),
                message: "busy".to_string()
            }
            .retry_class(),
            RetryClass::Retriable
        );
    }
}

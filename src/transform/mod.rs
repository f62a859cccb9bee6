//! Raw source payload to canonical record mapping.
//!
//! [`Transformer::transform`] never fails: every problem comes back as a
//! [`Transformed::Rejected`] carrying the reason, and the caller decides what
//! to count.

mod aftersale;
pub mod codes;
pub mod convert;
mod order;
mod product;
mod user;

use chrono::FixedOffset;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ValidationError;
use crate::records::{CanonicalRecord, EntityKind};

/// Why one raw record was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub entity: EntityKind,
    /// Natural id of the record when it could be read at all.
    pub record_id: Option<String>,
    pub reason: ValidationError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    Accepted(CanonicalRecord),
    Rejected(Rejection),
}

impl Transformed {
    pub fn accepted(self) -> Option<CanonicalRecord> {
        match self {
            Transformed::Accepted(record) => Some(record),
            Transformed::Rejected(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transformer {
    platform: String,
    offset: FixedOffset,
}

impl Transformer {
    /// `offset` is the zone naive source timestamps are written in.
    pub fn new(platform: impl Into<String>, offset: FixedOffset) -> Self {
        Self {
            platform: platform.into(),
            offset,
        }
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn transform(&self, kind: EntityKind, raw: &Value) -> Transformed {
        let result = match kind {
            EntityKind::Order => order::transform(self, raw),
            EntityKind::Aftersale => aftersale::transform(self, raw),
            EntityKind::User => user::transform(self, raw),
            EntityKind::Product => product::transform(self, raw),
        };

        match result {
            Ok(record) => Transformed::Accepted(record),
            Err(reason) => Transformed::Rejected(Rejection {
                entity: kind,
                record_id: record_id(kind, raw),
                reason,
            }),
        }
    }
}

/// Best-effort natural id of a raw payload, for diagnostics only.
pub fn record_id(kind: EntityKind, raw: &Value) -> Option<String> {
    let id = match kind {
        EntityKind::Order => raw
            .get("order_info")
            .and_then(|info| info.get("order_id"))
            .or_else(|| raw.get("order_id")),
        EntityKind::Aftersale => raw.get("aftersale_id"),
        EntityKind::User => raw.get("user_id"),
        EntityKind::Product => raw.get("resource_id"),
    };
    convert::text(id)
}

fn decode<T: DeserializeOwned>(entity: EntityKind, raw: &Value) -> Result<T, ValidationError> {
    T::deserialize(raw).map_err(|err| ValidationError::Malformed {
        entity,
        details: err.to_string(),
    })
}

/// Map every child, rejecting the parent on the first invalid one.
fn children<T, F>(raw: &[Value], mut map: F) -> Result<Vec<T>, ValidationError>
where
    F: FnMut(i32, &Value) -> Result<T, ValidationError>,
{
    raw.iter()
        .enumerate()
        .map(|(idx, item)| {
            let line = idx + 1;
            map(line as i32, item).map_err(|source| ValidationError::InvalidChild {
                line,
                source: Box::new(source),
            })
        })
        .collect()
}

//! Task registry.

use crate::records::EntityKind;

pub const ORDERS_INCREMENTAL: &str = "orders_incremental";
pub const ORDERS_STATUS_REFRESH: &str = "orders_status_refresh";
pub const USERS: &str = "users";
pub const PRODUCTS: &str = "products";
pub const AFTERSALES_INCREMENTAL: &str = "aftersales_incremental";

/// How a task remembers how far it got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Timestamp watermark; each run covers `(cursor - epsilon, now]`.
    Watermark,
    /// Opaque source token, resumed verbatim and saved after every page.
    Resume,
    /// Fixed trailing window rescanned every run. The cursor is never moved.
    Rescan,
    /// Full listing every run. The cursor is never moved.
    Snapshot,
}

impl Progress {
    pub const fn as_str(self) -> &'static str {
        match self {
            Progress::Watermark => "watermark",
            Progress::Resume => "resume",
            Progress::Rescan => "rescan",
            Progress::Snapshot => "snapshot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub id: &'static str,
    pub entity: EntityKind,
    pub progress: Progress,
}

/// Every task, in execution order.
pub const REGISTRY: [TaskSpec; 5] = [
    TaskSpec {
        id: ORDERS_INCREMENTAL,
        entity: EntityKind::Order,
        progress: Progress::Watermark,
    },
    TaskSpec {
        id: ORDERS_STATUS_REFRESH,
        entity: EntityKind::Order,
        progress: Progress::Rescan,
    },
    TaskSpec {
        id: USERS,
        entity: EntityKind::User,
        progress: Progress::Resume,
    },
    TaskSpec {
        id: PRODUCTS,
        entity: EntityKind::Product,
        progress: Progress::Snapshot,
    },
    TaskSpec {
        id: AFTERSALES_INCREMENTAL,
        entity: EntityKind::Aftersale,
        progress: Progress::Watermark,
    },
];

pub fn find(id: &str) -> Option<TaskSpec> {
    REGISTRY.iter().copied().find(|task| task.id == id)
}

/// Resolve requested task ids, keeping registry order. An empty request
/// selects every task; unknown ids are returned as the error.
pub fn select(requested: &[String]) -> Result<Vec<TaskSpec>, Vec<String>> {
    let unknown: Vec<String> = requested
        .iter()
        .filter(|id| find(id).is_none())
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(unknown);
    }

    Ok(REGISTRY
        .iter()
        .copied()
        .filter(|task| requested.is_empty() || requested.iter().any(|id| id == task.id))
        .collect())
}

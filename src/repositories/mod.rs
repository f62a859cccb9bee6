//! # Repository Layer
//!
//! Persistence of engine bookkeeping. Entity data is written by
//! [`crate::loader`]; this layer only owns per-task progress.

pub mod sync_state;

pub use sync_state::{StateUpdate, SyncState, SyncStateRepository, SyncStatus};

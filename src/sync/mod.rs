//! # Synchronization engine
//!
//! A task run is: determine the window from stored progress, page through
//! the source, transform and apply each page in its own transaction, then
//! always record the outcome.

pub mod fetch_loop;
pub mod orchestrator;
pub mod runner;
pub mod task;
pub mod window;

use chrono::{DateTime, Utc};

pub use fetch_loop::PaginatedFetchLoop;
pub use orchestrator::{RunOptions, RunReport, SyncOrchestrator};
pub use runner::{RunSummary, run_tasks};
pub use task::{Progress, TaskSpec};
pub use window::SyncWindow;

/// Source of "now" for window computation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stopped at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

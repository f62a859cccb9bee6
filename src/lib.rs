//! # storesync
//!
//! Incremental synchronization of orders, users, products and after-sale
//! orders from a paginated store API into a relational database.
//!
//! Each task pages through the source, maps raw payloads to canonical
//! records, upserts them page by page, and records its progress in
//! `sync_state` so the next run resumes where this one stopped.

pub mod config;
pub mod db;
pub mod error;
pub mod loader;
pub mod models;
pub mod records;
pub mod repositories;
pub mod retry;
pub mod source;
pub mod sync;
pub mod telemetry;
pub mod transform;
pub use migration;

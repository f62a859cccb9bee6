//! Shared fixtures for integration tests.
//!
//! An in-memory SQLite database migrated through `Migrator::up`, a scripted
//! source that replays queued pages, and builders for raw source payloads.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::{Value, json};

use storesync::config::SyncConfig;
use storesync::retry::RetryPolicy;
use storesync::source::{Cursor, Page, PageRequest, SourceClient, SourceError};
use storesync::sync::{FixedClock, SyncOrchestrator};
use storesync::transform::Transformer;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// A source that replays queued results in order, then reports no data.
#[derive(Default)]
pub struct ScriptedSource {
    pages: Mutex<VecDeque<Result<Page, SourceError>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedSource {
    pub fn new(results: Vec<Result<Page, SourceError>>) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(results.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceClient for ScriptedSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page, SourceError> {
        self.requests.lock().unwrap().push(request.clone());
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Page::default()))
    }
}

/// Paging and retry settings with every delay removed.
pub fn fast_sync_config() -> SyncConfig {
    SyncConfig {
        page_size: 50,
        page_delay_ms: 0,
        ..SyncConfig::default()
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), 2.0)
}

pub fn transformer() -> Transformer {
    Transformer::new("xiaoe", FixedOffset::east_opt(8 * 3600).unwrap())
}

/// Orchestrator over `source` whose clock is stopped at `now`.
pub fn orchestrator(source: Arc<dyn SourceClient>, now: DateTime<Utc>) -> SyncOrchestrator {
    SyncOrchestrator::new(source, transformer(), fast_retry(), fast_sync_config())
        .with_clock(Arc::new(FixedClock(now)))
}

/// A page of `items` that is followed by `next_page` when given.
pub fn page(items: Vec<Value>, next_page: Option<u64>) -> Page {
    Page {
        items,
        next_cursor: next_page.map(Cursor::from_page),
        has_more: next_page.is_some(),
        total_count: None,
    }
}

pub fn raw_order(id: &str) -> Value {
    json!({
        "order_info": {
            "order_id": id,
            "user_id": "u_1",
            "order_state": 1,
            "pay_state": 1,
            "actual_fee": 12345,
            "created_time": "2024-01-10 10:00:00",
            "update_time": "2024-01-10 12:00:00"
        },
        "price_info": {"freight_price": 0},
        "good_list": [
            {"resource_id": "p_1", "goods_name": "Course", "buy_num": 1, "unit_price": 12345}
        ]
    })
}

/// An order payload the transformer rejects: its creation time is a sentinel.
pub fn broken_order(id: &str) -> Value {
    let mut raw = raw_order(id);
    raw["order_info"]["created_time"] = json!("0000-00-00 00:00:00");
    raw
}

pub fn raw_orders(prefix: &str, count: usize) -> Vec<Value> {
    (0..count)
        .map(|n| raw_order(&format!("{prefix}_{n}")))
        .collect()
}

pub fn raw_user(id: &str, skip: u64) -> Value {
    json!({
        "user_id": id,
        "user_nickname": format!("user {id}"),
        "pay_sum": "2990",
        "user_created_at": "2023-05-01 12:00:00",
        "es_skip": {"id": skip}
    })
}

pub fn raw_product(id: &str) -> Value {
    json!({"resource_id": id, "goods_name": "Course", "sale_status": 1, "price_low": 990})
}

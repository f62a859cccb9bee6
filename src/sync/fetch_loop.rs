//! Cursor-driven paging over a [`SourceClient`].
//!
//! The loop only decides whether to keep paging. Whether the records in a
//! page were any good is the caller's business.

use std::time::Duration;

use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::retry::RetryPolicy;
use crate::source::{Cursor, Page, PageRequest, SourceClient};

pub struct PaginatedFetchLoop<'a> {
    source: &'a dyn SourceClient,
    retry: &'a RetryPolicy,
    request: PageRequest,
    max_pages: u32,
    page_delay: Duration,
    cancel: CancellationToken,
    pages_fetched: u32,
    finished: bool,
    truncated: bool,
}

impl<'a> PaginatedFetchLoop<'a> {
    pub fn new(
        source: &'a dyn SourceClient,
        retry: &'a RetryPolicy,
        request: PageRequest,
        max_pages: u32,
    ) -> Self {
        Self {
            source,
            retry,
            request,
            max_pages,
            page_delay: Duration::ZERO,
            cancel: CancellationToken::new(),
            pages_fetched: 0,
            finished: false,
            truncated: false,
        }
    }

    /// Pause applied before every page after the first.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Cancellation is checked before each fetch, never mid-page.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Pages returned by the source so far, including a final empty one.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Whether paging stopped at the page limit with data still pending.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Position the next fetch starts from.
    pub fn cursor(&self) -> Option<&Cursor> {
        self.request.cursor.as_ref()
    }

    /// Fetch the next non-empty page.
    ///
    /// Returns `Ok(None)` once the source is drained or the page limit is
    /// hit. Fetch failures go through the retry policy first; whatever
    /// survives it ends the loop.
    pub async fn next_page(&mut self) -> Result<Option<Page>, SyncError> {
        if self.finished {
            return Ok(None);
        }
        if self.pages_fetched >= self.max_pages {
            warn!(
                limit = self.max_pages,
                "page limit reached with more data reported, stopping"
            );
            self.finished = true;
            self.truncated = true;
            return Ok(None);
        }

        if self.pages_fetched > 0 && !self.page_delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.page_delay) => {}
                _ = self.cancel.cancelled() => {}
            }
        }

        let page_number = self.pages_fetched + 1;
        if self.cancel.is_cancelled() {
            self.finished = true;
            return Err(SyncError::Cancelled { page: page_number });
        }

        let source = self.source;
        let request = &self.request;
        let result = self
            .retry
            .execute(move || source.fetch_page(request))
            .await;
        let page = match result {
            Ok(page) => page,
            Err(err) => {
                self.finished = true;
                return Err(err.into());
            }
        };

        self.pages_fetched = page_number;
        counter!("sync_pages_fetched_total", "entity" => self.request.entity.as_str()).increment(1);
        debug!(
            page = page_number,
            items = page.items.len(),
            has_more = page.has_more,
            total = page.total_count,
            "page fetched"
        );

        if page.items.is_empty() {
            self.finished = true;
            return Ok(None);
        }

        match (&page.next_cursor, page.has_more) {
            (Some(next), true) => self.request.cursor = Some(next.clone()),
            (None, true) => {
                warn!(
                    page = page_number,
                    "source reported more data without a cursor, stopping"
                );
                self.finished = true;
            }
            (_, false) => self.finished = true,
        }

        Ok(Some(page))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::records::EntityKind;
    use crate::source::{SourceError, TransientKind};

    struct Pages {
        results: Mutex<VecDeque<Result<Page, SourceError>>>,
        seen: Mutex<Vec<Option<Cursor>>>,
    }

    impl Pages {
        fn new(results: Vec<Result<Page, SourceError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SourceClient for Pages {
        async fn fetch_page(&self, request: &PageRequest) -> Result<Page, SourceError> {
            self.seen.lock().unwrap().push(request.cursor.clone());
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Page::default()))
        }
    }

    fn page(count: usize, next: Option<u64>) -> Page {
        Page {
            items: (0..count).map(|i| json!({ "n": i })).collect(),
            next_cursor: next.map(Cursor::from_page),
            has_more: next.is_some(),
            total_count: None,
        }
    }

    fn request() -> PageRequest {
        PageRequest {
            entity: EntityKind::Product,
            window: None,
            cursor: None,
            page_size: 2,
        }
    }

    fn retry() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(1), 1.0)
    }

    #[tokio::test]
    async fn follows_cursor_until_source_is_drained() {
        let source = Pages::new(vec![Ok(page(2, Some(2))), Ok(page(1, None))]);
        let retry = retry();
        let mut pages = PaginatedFetchLoop::new(&source, &retry, request(), 10);

        assert_eq!(pages.next_page().await.unwrap().unwrap().items.len(), 2);
        assert_eq!(pages.next_page().await.unwrap().unwrap().items.len(), 1);
        assert!(pages.next_page().await.unwrap().is_none());
        assert_eq!(pages.pages_fetched(), 2);

        let seen = source.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![None, Some(Cursor::from_page(2))]);
    }

    #[tokio::test]
    async fn empty_page_stops_and_still_counts() {
        let source = Pages::new(vec![Ok(Page::default())]);
        let retry = retry();
        let mut pages = PaginatedFetchLoop::new(&source, &retry, request(), 10);

        assert!(pages.next_page().await.unwrap().is_none());
        assert_eq!(pages.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn page_limit_stops_paging_without_error() {
        let source = Pages::new(vec![Ok(page(2, Some(2))), Ok(page(2, Some(3)))]);
        let retry = retry();
        let mut pages = PaginatedFetchLoop::new(&source, &retry, request(), 1);

        assert!(pages.next_page().await.unwrap().is_some());
        assert!(!pages.truncated());
        assert!(pages.next_page().await.unwrap().is_none());
        assert!(pages.truncated());
        assert_eq!(pages.pages_fetched(), 1);
        assert_eq!(source.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn draining_within_the_limit_is_not_truncated() {
        let source = Pages::new(vec![Ok(page(2, None))]);
        let retry = retry();
        let mut pages = PaginatedFetchLoop::new(&source, &retry, request(), 1);

        assert!(pages.next_page().await.unwrap().is_some());
        assert!(pages.next_page().await.unwrap().is_none());
        assert!(!pages.truncated());
    }

    #[tokio::test]
    async fn exhausted_retries_end_the_loop() {
        let flaky = || SourceError::timeout("list");
        let source = Pages::new(vec![Ok(page(2, Some(2))), Err(flaky()), Err(flaky())]);
        let retry = retry();
        let mut pages = PaginatedFetchLoop::new(&source, &retry, request(), 10);

        assert!(pages.next_page().await.unwrap().is_some());
        let err = pages.next_page().await.unwrap_err();
        assert!(matches!(err, SyncError::RetryExhausted { attempts: 2, .. }));
        assert!(pages.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transient_failure_is_retried_transparently() {
        let source = Pages::new(vec![
            Err(SourceError::transient(TransientKind::Network, "list", "reset")),
            Ok(page(1, None)),
        ]);
        let retry = retry();
        let mut pages = PaginatedFetchLoop::new(&source, &retry, request(), 10);

        assert_eq!(pages.next_page().await.unwrap().unwrap().items.len(), 1);
        assert_eq!(pages.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn cancellation_is_observed_before_fetching() {
        let source = Pages::new(vec![Ok(page(2, Some(2)))]);
        let retry = retry();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut pages =
            PaginatedFetchLoop::new(&source, &retry, request(), 10).with_cancellation(cancel);

        let err = pages.next_page().await.unwrap_err();
        assert!(matches!(err, SyncError::Cancelled { page: 1 }));
        assert!(source.seen.lock().unwrap().is_empty());
    }
}

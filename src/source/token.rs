//! Shared access-token cache.
//!
//! One token is reused across every call and every task in the process. It is
//! refreshed lazily once it is within `lead` of expiry and dropped on the
//! first authentication failure so the next call fetches a fresh one.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Instant,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: Instant::now() + expires_in,
        }
    }

    fn is_fresh(&self, lead: Duration, now: Instant) -> bool {
        self.expires_at > now + lead
    }
}

#[derive(Debug)]
pub struct TokenCache {
    slot: Mutex<Option<AccessToken>>,
    lead: Duration,
}

impl TokenCache {
    pub fn new(lead: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            lead,
        }
    }

    /// Return the cached token, calling `refresh` first if it is missing or
    /// about to expire.
    ///
    /// The lock is held across `refresh`, so concurrent callers wait for a
    /// single refresh instead of issuing their own.
    pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken, E>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(token) = slot.as_ref()
            && token.is_fresh(self.lead, Instant::now())
        {
            return Ok(token.value.clone());
        }

        debug!("access token missing or near expiry, refreshing");
        let token = refresh().await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        if slot.take().is_some() {
            debug!("cached access token invalidated");
        }
    }

    pub async fn is_cached(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn reuses_fresh_token() {
        let cache = TokenCache::new(Duration::from_secs(300));
        let counter = AtomicU32::new(0);
        let refreshes = &counter;

        for _ in 0..3 {
            let token: Result<String, ()> = cache
                .get_or_refresh(|| async move {
                    refreshes.fetch_add(1, Ordering::SeqCst);
                    Ok(AccessToken::new("tok-1", Duration::from_secs(7200)))
                })
                .await;
            assert_eq!(token.unwrap(), "tok-1");
        }
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refreshes_token_inside_lead_window() {
        let cache = TokenCache::new(Duration::from_secs(300));
        let first: Result<String, ()> = cache
            .get_or_refresh(|| async { Ok(AccessToken::new("short", Duration::from_secs(60))) })
            .await;
        assert_eq!(first.unwrap(), "short");

        let second: Result<String, ()> = cache
            .get_or_refresh(|| async { Ok(AccessToken::new("long", Duration::from_secs(7200))) })
            .await;
        assert_eq!(second.unwrap(), "long");
    }

    #[tokio::test]
    async fn invalidate_forces_refresh() {
        let cache = TokenCache::new(Duration::from_secs(0));
        let _: Result<String, ()> = cache
            .get_or_refresh(|| async { Ok(AccessToken::new("old", Duration::from_secs(7200))) })
            .await;
        cache.invalidate().await;
        assert!(!cache.is_cached().await);

        let token: Result<String, ()> = cache
            .get_or_refresh(|| async { Ok(AccessToken::new("new", Duration::from_secs(7200))) })
            .await;
        assert_eq!(token.unwrap(), "new");
    }

    #[tokio::test]
    async fn failed_refresh_leaves_cache_empty() {
        let cache = TokenCache::new(Duration::from_secs(0));
        let result: Result<String, &str> = cache.get_or_refresh(|| async { Err("denied") }).await;
        assert_eq!(result, Err("denied"));
        assert!(!cache.is_cached().await);
    }
}

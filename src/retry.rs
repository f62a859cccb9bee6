//! Bounded exponential backoff around fallible async operations.
//!
//! Failures are classified as [`RetryClass::Retriable`] or
//! [`RetryClass::Terminal`]. Terminal failures propagate immediately without
//! sleeping; retriable failures are retried until `max_attempts` is spent, at
//! which point the last failure is returned as [`RetryError::Exhausted`].

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Retriable,
    Terminal,
}

/// Errors that know whether retrying them can help.
pub trait Retryable {
    fn retry_class(&self) -> RetryClass;
}

/// Outcome of an operation that did not succeed under a [`RetryPolicy`].
#[derive(Debug, PartialEq)]
pub enum RetryError<E> {
    /// Classified terminal; returned on the attempt it happened.
    Terminal(E),
    /// Every attempt failed with a retriable error; `last` is the final one.
    Exhausted { attempts: u32, last: E },
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Terminal(err) => err,
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

impl<E: Display> Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryError::Terminal(err) => write!(f, "{err}"),
            RetryError::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts: {last}")
            }
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetryError::Terminal(err) => Some(err),
            RetryError::Exhausted { last, .. } => Some(last),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
    max_delay: Duration,
    jitter_factor: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff_multiplier,
            max_delay: Duration::from_secs(60),
            jitter_factor: 0.0,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_delay_ms),
            config.backoff_multiplier,
        )
        .with_max_delay(Duration::from_millis(config.max_delay_ms))
        .with_jitter(config.jitter_factor)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `operation`, classifying failures through [`Retryable`].
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        self.execute_with(operation, E::retry_class).await
    }

    /// Run `operation`, classifying failures with `classify`.
    pub async fn execute_with<F, Fut, T, E, C>(
        &self,
        mut operation: F,
        classify: C,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        C: Fn(&E) -> RetryClass,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if classify(&err) == RetryClass::Terminal {
                        return Err(RetryError::Terminal(err));
                    }
                    if attempt >= self.max_attempts {
                        warn!(attempts = attempt, error = %err, "retry attempts exhausted");
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }

                    let sleep_for = self.jittered(delay);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = sleep_for.as_millis() as u64,
                        error = %err,
                        "retriable failure, backing off"
                    );
                    metrics::counter!("sync_fetch_retries_total").increment(1);
                    tokio::time::sleep(sleep_for).await;

                    delay = delay.mul_f64(self.backoff_multiplier).min(self.max_delay);
                    attempt += 1;
                }
            }
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter_factor <= 0.0 || delay.is_zero() {
            return delay;
        }
        let factor = rand::thread_rng()
            .gen_range(1.0 - self.jitter_factor..=1.0 + self.jitter_factor);
        delay.mul_f64(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Flaky,
        Fatal,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Retryable for TestError {
        fn retry_class(&self) -> RetryClass {
            match self {
                TestError::Flaky => RetryClass::Retriable,
                TestError::Fatal => RetryClass::Terminal,
            }
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), 2.0)
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt_without_escalating() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = policy()
            .execute(move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(TestError::Flaky) } else { Ok(n) }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = policy()
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Flaky)
            })
            .await;

        assert_eq!(
            result,
            Err(RetryError::Exhausted {
                attempts: 3,
                last: TestError::Flaky
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_failure_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let slow = RetryPolicy::new(5, Duration::from_secs(30), 2.0);
        let started = std::time::Instant::now();
        let result: Result<(), _> = slow
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Fatal)
            })
            .await;

        assert_eq!(result, Err(RetryError::Terminal(TestError::Fatal)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn custom_classifier_overrides_error_class() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = policy()
            .execute_with(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Fatal)
                },
                |_| RetryClass::Retriable,
            )
            .await;

        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = policy().with_jitter(0.5);
        for _ in 0..100 {
            let d = policy.jittered(Duration::from_millis(100));
            assert!(d >= Duration::from_millis(50) && d <= Duration::from_millis(150));
        }
    }
}

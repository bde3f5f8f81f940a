//! Retry policy with exponential backoff.
//!
//! One generic [`retry`] function parameterized per call site: the
//! operation, a retryability predicate on the error, and a hook invoked
//! before each backoff sleep (used for the rate-limit log lines).

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Attempt cap and base delay for exponential backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (not retries) before giving up.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles each retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before retrying after failed attempt `n` (0-based):
    /// `base_delay * 2^n`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Run `op` until it succeeds, returns a non-retryable error, or the
/// attempt cap is reached. `on_retry(attempt, err, delay)` fires before
/// each backoff sleep with the 1-based number of attempts made so far.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
    is_retryable: impl Fn(&E) -> bool,
    mut on_retry: impl FnMut(u32, &E, Duration),
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if !is_retryable(&err) || attempt >= policy.max_attempts {
                    return Err(err);
                }
                let delay = policy.delay_for_attempt(attempt - 1);
                on_retry(attempt, &err, delay);
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(8));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(16));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let result: Result<&str, &str> = retry(
            &fast_policy(),
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err("transient") } else { Ok("done") } }
            },
            |_| true,
            |_, _, _| {},
        )
        .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), &str> = retry(
            &fast_policy(),
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("hard failure") }
            },
            |_| false,
            |_, _, _| {},
        )
        .await;
        assert_eq!(result, Err("hard failure"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_attempt_cap_and_returns_last_error() {
        let attempts = AtomicU32::new(0);
        let retries_seen = AtomicU32::new(0);
        let result: Result<(), String> = retry(
            &fast_policy(),
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure {n}")) }
            },
            |_| true,
            |_, _, _| {
                retries_seen.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;
        assert_eq!(result, Err("failure 4".to_string()));
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
        assert_eq!(retries_seen.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn on_retry_reports_attempt_and_delay() {
        let seen: std::sync::Mutex<Vec<(u32, Duration)>> = std::sync::Mutex::new(Vec::new());
        let _: Result<(), &str> = retry(
            &RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(2),
            },
            || async { Err("nope") },
            |_| true,
            |attempt, _, delay| seen.lock().unwrap().push((attempt, delay)),
        )
        .await;
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (1, Duration::from_millis(2)),
                (2, Duration::from_millis(4)),
            ]
        );
    }
}

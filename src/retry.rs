//! Retrying transport for idempotent network calls.
//!
//! Peer uploads and downloads ride on HTTP and may hit transient failures
//! while the remote endpoint comes up. The policy retries transport errors
//! with capped exponential backoff and gives up after a fixed number of
//! attempts. Non-transport errors are never retried.

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::error::Result;

/// Backoff knobs for [`retry`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Base backoff multiplier in seconds.
    pub multiplier: u64,
    /// Lower bound on the delay between attempts.
    pub min_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            multiplier: 1,
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after `attempt` (1-based) has failed.
    ///
    /// Grows as `multiplier * 2^attempt` seconds, clamped to the configured
    /// bounds. The default policy therefore waits 4, 4, 8 and 10 seconds
    /// between its five attempts.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(32);
        let secs = self.multiplier.saturating_mul(2u64.saturating_pow(exponent));
        Duration::from_secs(secs).clamp(self.min_delay, self.max_delay)
    }
}

/// Runs `call` until it succeeds, the error is not retryable, or the policy
/// is exhausted. At least one attempt is always made.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "{} attempt {}/{} failed: {}; retrying in {:?}",
                    operation, attempt, policy.max_attempts, err, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::Error;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            multiplier: 1,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_default_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(4));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
        assert_eq!(policy.delay_after(4), Duration::from_secs(10));
        assert_eq!(policy.delay_after(5), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_succeeds_without_retry() {
        let attempts = AtomicU32::new(0);
        let result = retry(&fast_policy(), "noop", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let result = retry(&fast_policy(), "flaky", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 5 {
                    Err(Error::Transport("connection refused".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 5);
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_exhausts_after_max_attempts() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = retry(&fast_policy(), "down", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Transport("unreachable".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_does_not_retry_fatal_errors() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = retry(&fast_policy(), "bad-input", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Input("bad uri".into())) }
        })
        .await;
        assert!(matches!(result, Err(Error::Input(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}

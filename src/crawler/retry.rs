//! Retry policy with exponential backoff and jitter

use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Backoff policy for transient fetch failures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles for each attempt after that
    pub base_delay: Duration,

    /// Upper bound on any single backoff sleep
    pub max_delay: Duration,

    /// Upper bound on the random jitter added to each backoff
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(2),
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once and never sleeps
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Computes the sleep after a failed attempt
    ///
    /// `attempt` is the 1-based number of the attempt that just failed and
    /// `jitter_fraction` is in `[0, 1)`; passing a fixed fraction makes the
    /// result deterministic.
    pub fn backoff(&self, attempt: u32, jitter_fraction: f64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let exponential = self.base_delay.saturating_mul(1u32 << exponent);
        let jitter = self.max_jitter.mul_f64(jitter_fraction.clamp(0.0, 1.0));
        exponential.saturating_add(jitter).min(self.max_delay)
    }

    /// Computes the sleep after a failed attempt using random jitter
    pub fn random_backoff(&self, attempt: u32) -> Duration {
        let fraction = rand::rng().random_range(0.0..1.0);
        self.backoff(attempt, fraction)
    }
}

/// Runs `op` until it succeeds or the policy's attempts are exhausted
///
/// `op` receives the 1-based attempt number. The error of the final attempt
/// is returned unchanged.
pub async fn run_with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                let delay = policy.random_backoff(attempt);
                tracing::debug!(
                    "Attempt {}/{} failed ({}), retrying in {:?}",
                    attempt,
                    max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            max_jitter: Duration::ZERO,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(300));
        assert_eq!(policy.max_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_is_exponential_without_jitter() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1, 0.0), Duration::from_millis(300));
        assert_eq!(policy.backoff(2, 0.0), Duration::from_millis(600));
        assert_eq!(policy.backoff(3, 0.0), Duration::from_millis(1200));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(4, 0.0), Duration::from_secs(2));
        assert_eq!(policy.backoff(30, 0.99), Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_adds_jitter() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1, 0.5), Duration::from_millis(425));
    }

    #[test]
    fn test_random_backoff_within_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let delay = policy.random_backoff(1);
            assert!(delay >= Duration::from_millis(300));
            assert!(delay < Duration::from_millis(550));
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, String> = run_with_retry(&fast_policy(3), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(format!("failure {}", attempt))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_when_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = run_with_retry(&fast_policy(3), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("failure {}", attempt)) }
        })
        .await;

        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_policy_tries_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = run_with_retry(&RetryPolicy::no_retry(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("nope".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

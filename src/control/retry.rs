//! Retry with exponential backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Classifies which errors are worth retrying.
///
/// Non-retryable errors propagate immediately without consuming an attempt's
/// backoff sleep.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for crate::transport::TransportError {
    fn is_retryable(&self) -> bool {
        crate::transport::TransportError::is_retryable(self)
    }
}

/// Retry policy with exponential backoff.
///
/// Attempt `n` (0-based) sleeps `initial_delay * backoff_factor^n` before the
/// next try. The last failure is re-raised unchanged; nothing is swallowed.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts (>= 1), including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied per attempt.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff_factor,
        }
    }

    /// Delay before the retry following 0-based attempt `attempt`.
    fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .mul_f64(self.backoff_factor.powi(attempt as i32))
    }

    /// Run `op` until it succeeds, a non-retryable error occurs, or attempts
    /// are exhausted.
    pub async fn run<T, E, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);

        for attempt in 0..max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => {
                    tracing::warn!(operation = op_name, error = %err, "Non-retryable error");
                    return Err(err);
                }
                Err(err) if attempt + 1 == max_attempts => {
                    tracing::error!(
                        operation = op_name,
                        attempts = max_attempts,
                        error = %err,
                        "Operation failed after all retry attempts"
                    );
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        operation = op_name,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        unreachable!("retry loop always returns on the final attempt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError {
        retryable: bool,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error")
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), 2.0)
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, TestError> = fast_policy(3)
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(42) }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_calls_exactly_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, TestError> = fast_policy(3)
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError { retryable: true }) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, TestError> = fast_policy(3)
            .run("op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(TestError { retryable: true })
                    } else {
                        Ok("recovered")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, TestError> = fast_policy(5)
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError { retryable: false }) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_delays_grow_exponentially() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100), 2.0);
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }
}

//! Circuit breaker for external model dependencies.
//!
//! Tracks consecutive failures per named dependency and fails fast while the
//! dependency is judged unhealthy, so a degraded provider does not absorb
//! every request's full retry budget.

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation; calls pass through and failures are counted.
    Closed,
    /// Threshold reached; calls are rejected without being attempted.
    Open,
    /// Timeout elapsed; a single trial call is permitted.
    HalfOpen,
}

/// Error returned around a protected call.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// Circuit is open; the wrapped operation was not invoked.
    #[error("Circuit breaker '{name}' is open; retry in {retry_in:?}")]
    Open { name: String, retry_in: Duration },

    /// The wrapped operation ran and failed.
    #[error(transparent)]
    Inner(E),
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    consecutive_failures: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker for a single named dependency.
///
/// State transitions are atomic with the failure-counter update: the counter
/// and timestamp live under one mutex, so two concurrent failing calls
/// straddling the threshold cannot both observe a closed circuit after the
/// threshold is crossed.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            timeout,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                last_failure_time: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute `op` through the breaker.
    ///
    /// While open, returns `BreakerError::Open` without invoking `op`. Once
    /// `timeout` has elapsed since the last failure the next call transitions
    /// to half-open and runs a single trial.
    pub async fn call<T, E, F, Fut>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        self.check()?;

        match op().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(BreakerError::Inner(err))
            }
        }
    }

    /// Gate a call: pass while closed/half-open, reject while open.
    ///
    /// Performs the OPEN -> HALF_OPEN transition when the timeout has elapsed.
    fn check<E>(&self) -> Result<(), BreakerError<E>> {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");

        if inner.state == BreakerState::Open {
            let elapsed = inner
                .last_failure_time
                .map(|t| t.elapsed())
                .unwrap_or(Duration::MAX);

            if elapsed > self.timeout {
                inner.state = BreakerState::HalfOpen;
                tracing::info!(breaker = %self.name, "Circuit breaker transitioned to HALF_OPEN");
            } else {
                let retry_in = self.timeout.saturating_sub(elapsed);
                tracing::warn!(breaker = %self.name, retry_in_secs = retry_in.as_secs(), "Circuit breaker is OPEN");
                return Err(BreakerError::Open {
                    name: self.name.clone(),
                    retry_in,
                });
            }
        }

        Ok(())
    }

    /// Record a successful call. Any success closes the circuit and zeroes
    /// the consecutive-failure counter.
    fn on_success(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        if inner.state == BreakerState::HalfOpen {
            tracing::info!(breaker = %self.name, "Circuit breaker transitioned to CLOSED");
        }
        inner.consecutive_failures = 0;
        inner.state = BreakerState::Closed;
    }

    /// Record a failed call, opening the circuit at the threshold.
    ///
    /// A half-open trial failure re-opens immediately and restarts the timer.
    fn on_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.consecutive_failures += 1;
        inner.last_failure_time = Some(Instant::now());

        if inner.consecutive_failures >= self.failure_threshold {
            if inner.state != BreakerState::Open {
                tracing::error!(
                    breaker = %self.name,
                    failures = inner.consecutive_failures,
                    "Circuit breaker transitioned to OPEN"
                );
                crate::metrics::record_breaker_open(&self.name);
            }
            inner.state = BreakerState::Open;
        } else if inner.state == BreakerState::HalfOpen {
            // Trial call failed below threshold; treat as a fresh trip.
            tracing::error!(breaker = %self.name, "Half-open trial failed; circuit re-opened");
            inner.state = BreakerState::Open;
        }
    }

    /// Manually reset to CLOSED. Idempotent.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.consecutive_failures = 0;
        inner.last_failure_time = None;
        inner.state = BreakerState::Closed;
        tracing::info!(breaker = %self.name, "Circuit breaker reset");
    }

    /// Current state (for observability endpoints).
    pub fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");

        // Surface the pending OPEN -> HALF_OPEN transition to readers too.
        if inner.state == BreakerState::Open {
            if let Some(t) = inner.last_failure_time {
                if t.elapsed() > self.timeout {
                    inner.state = BreakerState::HalfOpen;
                }
            }
        }
        inner.state
    }

    /// Current consecutive-failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.inner
            .lock()
            .expect("breaker lock poisoned")
            .consecutive_failures
    }

    #[cfg(test)]
    pub(crate) fn force_last_failure_elapsed(&self, elapsed: Duration) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.last_failure_time = Some(Instant::now() - elapsed);
    }
}

/// Registry of breakers, one per named external dependency.
///
/// Constructed once at startup and shared by handle; breakers are created
/// lazily on first use with the registry's default thresholds.
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    failure_threshold: u32,
    timeout: Duration,
}

impl BreakerRegistry {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            breakers: DashMap::new(),
            failure_threshold,
            timeout,
        }
    }

    /// Get or create the breaker for a dependency name.
    pub fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(
                    name,
                    self.failure_threshold,
                    self.timeout,
                ))
            })
            .clone()
    }

    /// Reset every breaker to CLOSED.
    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }
}

//! Sliding-window rate limiter keyed by client identity.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Rejection with a retry-after hint.
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded for '{client_id}'; retry after {retry_after:?}")]
    Exceeded {
        client_id: String,
        retry_after: Duration,
    },
}

/// Sliding-window request limiter.
///
/// Each client identity (usually the caller IP) holds a list of request
/// timestamps, pruned lazily to the window on every check. Prune, boundary
/// check and record happen under the per-client map entry so two concurrent
/// callers cannot both slip past the limit.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    windows: DashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        tracing::info!(
            max_requests,
            window_seconds = window.as_secs(),
            "Rate limiter initialized"
        );
        Self {
            max_requests,
            window,
            windows: DashMap::new(),
        }
    }

    /// Check and record a request for `client_id`.
    ///
    /// Rejects with a clamped retry-after hint once the window holds
    /// `max_requests` entries; otherwise records now and accepts.
    pub fn check(&self, client_id: &str) -> Result<(), RateLimitError> {
        self.check_at(client_id, Instant::now())
    }

    fn check_at(&self, client_id: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut entry = self.windows.entry(client_id.to_string()).or_default();

        entry.retain(|t| now.duration_since(*t) < self.window);

        if entry.len() >= self.max_requests {
            // retry_after counts from the oldest request still in the window.
            let oldest = entry[0];
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));

            tracing::warn!(
                client_id,
                requests = entry.len(),
                max_requests = self.max_requests,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            crate::metrics::record_rate_limit_reject();

            return Err(RateLimitError::Exceeded {
                client_id: client_id.to_string(),
                retry_after,
            });
        }

        entry.push(now);
        Ok(())
    }

    /// Clear one client's window (admin function).
    pub fn reset_client(&self, client_id: &str) {
        if self.windows.remove(client_id).is_some() {
            tracing::info!(client_id, "Rate limit reset for client");
        }
    }

    /// Remaining requests for a client. Read-only projection of the same
    /// pruning logic; an absent client has the full allowance.
    pub fn get_remaining(&self, client_id: &str) -> usize {
        let now = Instant::now();
        match self.windows.get(client_id) {
            Some(entry) => {
                let recent = entry
                    .iter()
                    .filter(|t| now.duration_since(**t) < self.window)
                    .count();
                self.max_requests.saturating_sub(recent)
            }
            None => self.max_requests,
        }
    }

    /// Number of client identities currently tracked.
    pub fn active_clients(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_max_requests() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        for _ in 0..3 {
            assert!(limiter.check("10.0.0.1").is_ok());
        }
        let result = limiter.check("10.0.0.1");
        match result {
            Err(RateLimitError::Exceeded { retry_after, .. }) => {
                assert!(retry_after > Duration::ZERO);
            }
            Ok(()) => panic!("4th request within the window must be rejected"),
        }
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.check_at("10.0.0.1", start).unwrap();
        }
        assert!(limiter.check_at("10.0.0.1", start).is_err());

        // Past the window the old requests no longer count.
        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at("10.0.0.1", later).is_ok());
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("b").is_ok());
        assert!(limiter.check("a").is_err());
    }

    #[test]
    fn test_reset_client_clears_window() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.check("a").unwrap();
        assert!(limiter.check("a").is_err());

        limiter.reset_client("a");
        assert!(limiter.check("a").is_ok());
    }

    #[test]
    fn test_get_remaining() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        assert_eq!(limiter.get_remaining("unknown"), 5);

        limiter.check("a").unwrap();
        limiter.check("a").unwrap();
        assert_eq!(limiter.get_remaining("a"), 3);
    }
}

//! Error types for model transport operations.

use thiserror::Error;

/// Errors that can occur while talking to a model provider.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Network connectivity error (DNS, connection refused, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded deadline.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Provider returned an error response (4xx, 5xx).
    #[error("Provider error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Provider signalled rate limiting (HTTP 429).
    #[error("Provider rate limited: {0}")]
    RateLimited(String),

    /// Provider response doesn't match the expected format.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Transport configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TransportError {
    /// Whether a retry has any chance of succeeding.
    ///
    /// Timeouts, rate limiting, network failures and 5xx responses are
    /// transient; auth failures, bad requests and malformed responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network(_) | TransportError::Timeout(_) => true,
            TransportError::RateLimited(_) => true,
            TransportError::Upstream { status, .. } => *status >= 500,
            TransportError::InvalidResponse(_) | TransportError::Configuration(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(TransportError::Timeout(30_000).is_retryable());
        assert!(TransportError::Network("connection refused".into()).is_retryable());
        assert!(TransportError::RateLimited("429".into()).is_retryable());
        assert!(TransportError::Upstream {
            status: 503,
            message: "overloaded".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_permanent_errors_are_not_retryable() {
        assert!(!TransportError::Upstream {
            status: 401,
            message: "bad key".into()
        }
        .is_retryable());
        assert!(!TransportError::InvalidResponse("no choices".into()).is_retryable());
        assert!(!TransportError::Configuration("missing api key".into()).is_retryable());
    }
}

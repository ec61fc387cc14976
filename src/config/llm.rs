//! Model call configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters for the three model-backed operations and the protection
/// pipeline wrapped around them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model for estimation and free-text adjustment calls.
    pub model: String,

    /// Model for proposal generation (benefits from a stronger model).
    pub proposal_model: String,

    /// Max completion tokens per operation.
    pub estimate_max_tokens: u32,
    pub adjust_max_tokens: u32,
    pub proposal_max_tokens: u32,
    pub question_max_tokens: u32,

    /// Sampling temperatures per operation.
    pub estimate_temperature: f32,
    pub adjust_temperature: f32,
    pub proposal_temperature: f32,
    pub question_temperature: f32,

    /// Per-call deadline in seconds.
    pub timeout_secs: u64,

    /// Retry attempts per call (including the first).
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds.
    pub retry_initial_delay_ms: u64,

    /// Backoff multiplier per attempt.
    pub retry_backoff_factor: f64,

    /// Consecutive failures before a breaker opens.
    pub breaker_failure_threshold: u32,

    /// Seconds an open breaker waits before a half-open trial.
    pub breaker_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            proposal_model: "gpt-4o".to_string(),
            estimate_max_tokens: 800,
            adjust_max_tokens: 1000,
            proposal_max_tokens: 2000,
            question_max_tokens: 500,
            estimate_temperature: 0.3,
            adjust_temperature: 0.2,
            proposal_temperature: 0.7,
            question_temperature: 0.7,
            timeout_secs: 30,
            max_retries: 3,
            retry_initial_delay_ms: 1000,
            retry_backoff_factor: 2.0,
            breaker_failure_threshold: 5,
            breaker_timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_initial_delay(&self) -> Duration {
        Duration::from_millis(self.retry_initial_delay_ms)
    }

    pub fn breaker_timeout(&self) -> Duration {
        Duration::from_secs(self.breaker_timeout_secs)
    }

    /// Validate configuration at startup.
    pub fn validate(&self) -> Result<(), String> {
        if self.model.is_empty() {
            return Err("model must not be empty".to_string());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be >= 1".to_string());
        }
        if self.retry_backoff_factor < 1.0 {
            return Err("retry_backoff_factor must be >= 1.0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be non-zero".to_string());
        }
        Ok(())
    }
}

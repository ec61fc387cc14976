//! Resource limit configuration: budgets, rate limiting, loop and
//! parallelism bounds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Daily spend ceiling in USD; crossing 80% logs a warning.
    pub daily_cost_limit_usd: f64,

    /// Monthly spend ceiling in USD; crossing it is fatal.
    pub monthly_cost_limit_usd: f64,

    /// Requests allowed per client per window.
    pub rate_max_requests: usize,

    /// Sliding-window length in seconds.
    pub rate_window_seconds: u64,

    /// Iteration ceiling per logical context.
    pub max_iterations: u32,

    /// Concurrent in-flight estimation calls (backpressure against the
    /// provider).
    pub max_parallel_estimates: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            daily_cost_limit_usd: 10.0,
            monthly_cost_limit_usd: 200.0,
            rate_max_requests: 100,
            rate_window_seconds: 3600,
            max_iterations: 10,
            max_parallel_estimates: 5,
        }
    }
}

impl LimitsConfig {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_seconds)
    }

    /// Validate configuration at startup.
    pub fn validate(&self) -> Result<(), String> {
        if self.monthly_cost_limit_usd < 0.0 || self.daily_cost_limit_usd < 0.0 {
            return Err("cost limits must be >= 0".to_string());
        }
        if self.rate_max_requests == 0 {
            return Err("rate_max_requests must be non-zero".to_string());
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be non-zero".to_string());
        }
        if self.max_parallel_estimates == 0 {
            return Err("max_parallel_estimates must be non-zero".to_string());
        }
        Ok(())
    }
}

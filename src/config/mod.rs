//! Configuration module
//!
//! Provides layered configuration loading from files, environment variables,
//! and defaults.
//!
//! # Configuration Precedence
//!
//! 1. Environment variables (`SEKISAN_*`)
//! 2. Configuration file (TOML)
//! 3. Default values (lowest priority)

pub mod error;
pub mod limits;
pub mod llm;
pub mod logging;
pub mod pricing;

pub use error::ConfigError;
pub use limits::LimitsConfig;
pub use llm::LlmConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use pricing::{Locale, PricingConfig};

use crate::adjust::rules::RuleBook;
use crate::estimate::FallbackTable;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the estimation core.
///
/// The `rules` and `fallback` sections carry the bilingual keyword tables as
/// swappable data, so locale or domain extensions never touch the engines.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SekisanConfig {
    /// Model call parameters and protection pipeline thresholds
    pub llm: LlmConfig,
    /// Unit cost, tax rate, token prices
    pub pricing: PricingConfig,
    /// Budgets, rate limiting, loop and parallelism bounds
    pub limits: LimitsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Free-text adjustment keyword tables
    pub rules: RuleBook,
    /// Estimation fallback keyword table
    pub fallback: FallbackTable,
}

impl SekisanConfig {
    /// Load configuration from a TOML file.
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supports SEKISAN_* variables for common settings. Invalid values are
    /// silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("SEKISAN_MODEL") {
            self.llm.model = model;
        }
        if let Ok(cost) = std::env::var("SEKISAN_DAILY_UNIT_COST") {
            if let Ok(v) = cost.parse() {
                self.pricing.daily_unit_cost = v;
            }
        }
        if let Ok(limit) = std::env::var("SEKISAN_MONTHLY_COST_LIMIT") {
            if let Ok(v) = limit.parse() {
                self.limits.monthly_cost_limit_usd = v;
            }
        }
        if let Ok(level) = std::env::var("SEKISAN_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SEKISAN_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.llm
            .validate()
            .map_err(|m| ConfigError::validation("llm", m))?;
        self.pricing
            .validate()
            .map_err(|m| ConfigError::validation("pricing", m))?;
        self.limits
            .validate()
            .map_err(|m| ConfigError::validation("limits", m))?;
        Ok(())
    }
}

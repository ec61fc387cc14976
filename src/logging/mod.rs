//! Structured logging setup.
//!
//! This module turns a [`LoggingConfig`] into tracing subscriber settings.
//! Initialization is opt-in; embedding processes that already install a
//! subscriber just skip [`init`].

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Build filter directives string from LoggingConfig.
///
/// Constructs a tracing filter string with the base level plus any
/// component-specific levels, e.g. "info,sekisan::adjust=debug".
pub fn build_filter_directives(config: &LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        for (component, level) in component_levels {
            filter_str.push_str(&format!(",sekisan::{}={}", component, level));
        }
    }

    filter_str
}

/// Install a global tracing subscriber from the configuration.
///
/// Returns an error string when a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), String> {
    let filter = EnvFilter::try_new(build_filter_directives(config))
        .map_err(|e| format!("invalid log filter: {}", e))?;

    let result = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
    };

    result.map_err(|e| format!("failed to install subscriber: {}", e))
}

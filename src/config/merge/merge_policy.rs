//! Merge rules: defaults, override order, conflict handling.

use crate::config::DEFAULT_LOGGING_ENDPOINT;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources override these key by key, so a file that only sets
/// `check_in.initial_debounce_ms` keeps every other default.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("active", false)?
        .set_default("environment", "development")?
        .set_default("logging_endpoint", DEFAULT_LOGGING_ENDPOINT)?
        .set_default("check_in.initial_debounce_ms", 100)?
        .set_default("check_in.between_transmissions_debounce_ms", 10_000)?
        .set_default("check_in.shutdown_timeout_ms", 5_000)?
        .set_default("check_in.request_timeout_ms", 30_000)
}

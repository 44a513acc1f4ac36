//! Environment variable source: APPSIGNAL_* overrides everything else.
//!
//! Nested keys use a double underscore, e.g.
//! `APPSIGNAL_CHECK_IN__INITIAL_DEBOUNCE_MS` sets `check_in.initial_debounce_ms`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub const ENV_PREFIX: &str = "APPSIGNAL";

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}

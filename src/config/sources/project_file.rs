//! Project config file source: config/appsignal.toml and config/appsignal.{env}.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;

/// Environment variable selecting the environment-specific project file
pub const APP_ENV_VAR: &str = "APPSIGNAL_APP_ENV";

/// Add project config files to builder.
/// Precedence: config/appsignal.toml (base) then config/appsignal.{APPSIGNAL_APP_ENV}.toml.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    project_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let config_dir = project_root.join("config");
    let mut builder = builder;

    let base_config_path = config_dir.join("appsignal.toml");
    if base_config_path.exists() {
        builder = builder.add_source(File::from(base_config_path).required(false));
    }

    if let Ok(env_name) = std::env::var(APP_ENV_VAR) {
        let env_config_path = config_dir.join(format!("appsignal.{}.toml", env_name));
        if env_config_path.exists() {
            builder = builder.add_source(File::from(env_config_path).required(false));
        }
    }

    Ok(builder)
}

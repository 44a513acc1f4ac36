//! Config loading entry points.

use crate::config::merge::merge_policy;
use crate::config::sources::{environment, global_file, project_file};
use crate::config::AppsignalConfig;
use config::{ConfigError, File};
use std::path::{Path, PathBuf};

/// Loads `AppsignalConfig` from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a project.
    ///
    /// Precedence (highest last): defaults, global file, `config/appsignal.toml`,
    /// `config/appsignal.{APPSIGNAL_APP_ENV}.toml`, `APPSIGNAL_*` variables.
    pub fn load(project_root: &Path) -> Result<AppsignalConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = project_file::add_to_builder(builder, project_root)?;
        let builder = environment::add_to_builder(builder);

        builder.build()?.try_deserialize()
    }

    /// Load configuration from a single file on top of the defaults.
    pub fn load_from_file(path: &Path) -> Result<AppsignalConfig, ConfigError> {
        merge_policy::builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }

    /// Path of the global config file, if a home directory is known
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}

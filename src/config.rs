//! Configuration System
//!
//! Layered configuration for the check-in agent: built-in defaults, a global
//! config file, project config files, then `APPSIGNAL_*` environment variables.
//! Validation collects every problem instead of stopping at the first.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Default collector endpoint for check-ins
pub const DEFAULT_LOGGING_ENDPOINT: &str = "https://appsignal-endpoint.net";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppsignalConfig {
    /// Whether check-ins are reported at all
    #[serde(default)]
    pub active: bool,

    /// Push API key used to authenticate with the collector
    #[serde(default)]
    pub push_api_key: Option<String>,

    /// Application name
    #[serde(default)]
    pub name: String,

    /// Application environment (production, staging, ...)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Hostname reported with each batch
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Base URL of the check-in collector
    #[serde(default = "default_logging_endpoint")]
    pub logging_endpoint: String,

    /// Scheduler tuning
    #[serde(default)]
    pub check_in: CheckInConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn default_logging_endpoint() -> String {
    DEFAULT_LOGGING_ENDPOINT.to_string()
}

impl Default for AppsignalConfig {
    fn default() -> Self {
        Self {
            active: false,
            push_api_key: None,
            name: String::new(),
            environment: default_environment(),
            hostname: default_hostname(),
            logging_endpoint: default_logging_endpoint(),
            check_in: CheckInConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Check-in scheduler tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInConfig {
    /// Debounce before the first transmission (milliseconds)
    #[serde(default = "default_initial_debounce_ms")]
    pub initial_debounce_ms: u64,

    /// Debounce before every later transmission (milliseconds)
    #[serde(default = "default_between_transmissions_debounce_ms")]
    pub between_transmissions_debounce_ms: u64,

    /// Upper bound on how long `stop()` waits for the final flush (milliseconds)
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// HTTP request timeout for one transmission (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_initial_debounce_ms() -> u64 {
    100
}

fn default_between_transmissions_debounce_ms() -> u64 {
    10_000
}

fn default_shutdown_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for CheckInConfig {
    fn default() -> Self {
        Self {
            initial_debounce_ms: default_initial_debounce_ms(),
            between_transmissions_debounce_ms: default_between_transmissions_debounce_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl CheckInConfig {
    pub fn initial_debounce(&self) -> Duration {
        Duration::from_millis(self.initial_debounce_ms)
    }

    pub fn between_transmissions_debounce(&self) -> Duration {
        Duration::from_millis(self.between_transmissions_debounce_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate scheduler tuning
    pub fn validate(&self) -> Result<(), String> {
        if self.shutdown_timeout_ms == 0 {
            return Err("shutdown_timeout_ms must be greater than zero".to_string());
        }
        if self.request_timeout_ms == 0 {
            return Err("request_timeout_ms must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Endpoint(String),
    Credentials(String),
    CheckIn(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Endpoint(msg) => write!(f, "Endpoint: {}", msg),
            ValidationError::Credentials(msg) => write!(f, "Credentials: {}", msg),
            ValidationError::CheckIn(msg) => write!(f, "Check-in: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl AppsignalConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let endpoint = self.logging_endpoint.trim();
        if endpoint.is_empty() {
            errors.push(ValidationError::Endpoint(
                "logging_endpoint cannot be empty".to_string(),
            ));
        } else if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            errors.push(ValidationError::Endpoint(format!(
                "logging_endpoint must be an http(s) URL, got '{}'",
                endpoint
            )));
        }

        if self.active
            && self
                .push_api_key
                .as_deref()
                .map_or(true, |key| key.trim().is_empty())
        {
            errors.push(ValidationError::Credentials(
                "push_api_key is required when active".to_string(),
            ));
        }

        if let Err(e) = self.check_in.validate() {
            errors.push(ValidationError::CheckIn(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

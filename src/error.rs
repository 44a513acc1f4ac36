//! Error types for the check-in delivery agent.

use thiserror::Error;

/// Transmission-related errors
///
/// These never escape the scheduler worker: a failed transmission is logged and
/// the batch is dropped.
#[derive(Debug, Clone, Error)]
pub enum TransmitError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Failed to encode check-in events: {0}")]
    Encode(String),

    #[error("Transmitter not configured: {0}")]
    NotConfigured(String),
}

/// Agent-level errors (configuration, logging, startup)
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transmitter error: {0}")]
    Transmitter(#[from] TransmitError),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Scheduler worker error: {0}")]
    Worker(String),
}

impl From<config::ConfigError> for AgentError {
    fn from(err: config::ConfigError) -> Self {
        AgentError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for TransmitError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransmitError::Timeout(error.to_string())
        } else if error.is_connect() {
            TransmitError::Connection(error.to_string())
        } else {
            TransmitError::Http(error.to_string())
        }
    }
}

//! Collector transmission
//!
//! The scheduler only depends on the [`Transmitter`] trait. [`HttpTransmitter`]
//! posts batches to the AppSignal check-in endpoint with a single attempt per
//! batch; failures are reported back to the caller, never retried here.

use crate::check_in::CheckInEvent;
use crate::config::AppsignalConfig;
use crate::error::TransmitError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::trace;

/// Wire format of a transmitted batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// A single JSON array
    Json,
    /// One JSON object per line
    Ndjson,
}

impl Format {
    pub fn content_type(self) -> &'static str {
        match self {
            Format::Json => "application/json; charset=UTF-8",
            Format::Ndjson => "application/x-ndjson; charset=UTF-8",
        }
    }
}

/// Delivers one batch of check-in events to the collector
///
/// Returns the HTTP status of the collector's response. Anything outside the
/// 2xx range is a failed transmission; `Err` is a transport failure.
#[async_trait]
pub trait Transmitter: Send + Sync {
    async fn transmit(&self, events: &[CheckInEvent], format: Format)
        -> Result<u16, TransmitError>;
}

/// Whether a collector status counts as an accepted batch
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Encode a batch in the given wire format
pub fn encode_body(events: &[CheckInEvent], format: Format) -> Result<String, TransmitError> {
    match format {
        Format::Json => {
            serde_json::to_string(events).map_err(|e| TransmitError::Encode(e.to_string()))
        }
        Format::Ndjson => {
            let lines = events
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| TransmitError::Encode(e.to_string()))?;
            Ok(lines.join("\n"))
        }
    }
}

const CHECK_IN_PATH: &str = "check_ins/json";
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP transmitter for the AppSignal collector
pub struct HttpTransmitter {
    client: Client,
    url: String,
    query: Vec<(&'static str, String)>,
}

impl HttpTransmitter {
    pub fn new(config: &AppsignalConfig) -> Result<Self, TransmitError> {
        let push_api_key = config.push_api_key.clone().ok_or_else(|| {
            TransmitError::NotConfigured("push_api_key is not set".to_string())
        })?;

        let client = Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(config.check_in.request_timeout())
            .build()
            .map_err(|e| TransmitError::NotConfigured(format!("Failed to create HTTP client: {}", e)))?;

        let query = vec![
            ("api_key", push_api_key),
            ("name", config.name.clone()),
            ("environment", config.environment.clone()),
            ("hostname", config.hostname.clone()),
            // Parameter name the collector expects for the agent version
            ("gem_version", env!("CARGO_PKG_VERSION").to_string()),
        ];

        Ok(Self {
            client,
            url: check_in_url(&config.logging_endpoint),
            query,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Build the check-in URL from the configured logging endpoint
pub fn check_in_url(endpoint: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), CHECK_IN_PATH)
}

#[async_trait]
impl Transmitter for HttpTransmitter {
    async fn transmit(
        &self,
        events: &[CheckInEvent],
        format: Format,
    ) -> Result<u16, TransmitError> {
        let body = encode_body(events, format)?;
        trace!(url = %self.url, events = events.len(), bytes = body.len(), "Posting check-in batch");

        let response = self
            .client
            .post(&self.url)
            .query(&self.query)
            .header("Content-Type", format.content_type())
            .body(body)
            .send()
            .await?;

        Ok(response.status().as_u16())
    }
}

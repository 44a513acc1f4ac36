//! Check-in event schema.

use crate::check_in::digest::{compute_digest, Digest, Occurrence};
use chrono::Utc;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckInType {
    Cron,
    Heartbeat,
}

impl CheckInType {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckInType::Cron => "cron",
            CheckInType::Heartbeat => "heartbeat",
        }
    }
}

impl fmt::Display for CheckInType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckInKind {
    Start,
    Finish,
}

impl CheckInKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckInKind::Start => "start",
            CheckInKind::Finish => "finish",
        }
    }
}

impl fmt::Display for CheckInKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One check-in occurrence, as delivered to the collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckInEvent {
    pub identifier: String,
    pub digest: Digest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<CheckInKind>,
    /// UTC seconds
    pub timestamp: i64,
    pub check_in_type: CheckInType,
}

impl CheckInEvent {
    /// Build a cron event for the given occurrence, stamped with the current time.
    pub fn cron(identifier: impl Into<String>, kind: CheckInKind, occurrence: Occurrence) -> Self {
        let identifier = identifier.into();
        let digest = compute_digest(CheckInType::Cron, &identifier, Some(kind), occurrence);
        Self {
            identifier,
            digest,
            kind: Some(kind),
            timestamp: Utc::now().timestamp(),
            check_in_type: CheckInType::Cron,
        }
    }

    /// Build a heartbeat event. Every heartbeat is its own occurrence.
    pub fn heartbeat(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let digest = compute_digest(
            CheckInType::Heartbeat,
            &identifier,
            None,
            Occurrence::next(),
        );
        Self {
            identifier,
            digest,
            kind: None,
            timestamp: Utc::now().timestamp(),
            check_in_type: CheckInType::Heartbeat,
        }
    }

    /// Human-readable description used in every scheduler log line, e.g.
    /// ``cron check-in `backup` finish event (digest 1f2e…)``.
    pub fn describe(&self) -> String {
        match self.kind {
            Some(kind) => format!(
                "{} check-in `{}` {} event (digest {})",
                self.check_in_type, self.identifier, kind, self.digest
            ),
            None => format!(
                "{} check-in `{}` event (digest {})",
                self.check_in_type, self.identifier, self.digest
            ),
        }
    }
}

/// Describe a batch: the single event, or a count
pub fn describe_batch(events: &[CheckInEvent]) -> String {
    match events {
        [event] => event.describe(),
        _ => format!("{} check-in events", events.len()),
    }
}

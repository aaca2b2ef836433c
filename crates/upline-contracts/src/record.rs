// Canonical log record
//
// One record is produced per raw event. Records are immutable once built
// and are owned by the phase log they are appended to. The serialized
// field names (camelCase, `type` for the display kind) are the contract
// the display collaborator renders from.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Display category of a log record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogKind {
    Info,
    Success,
    Error,
    StepProgress,
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogKind::Info => write!(f, "INFO"),
            LogKind::Success => write!(f, "SUCCESS"),
            LogKind::Error => write!(f, "ERROR"),
            LogKind::StepProgress => write!(f, "STEP_PROGRESS"),
        }
    }
}

/// Normalized, display-ready log record
///
/// Invariants: `id` is unique within a session (UUIDv7, time-ordered);
/// `message` is never empty; the normalizer falls back to a stringified
/// payload before constructing the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalLogRecord {
    /// Unique record id
    pub id: String,
    /// Wall-clock display time (HH:MM:SS, local)
    pub timestamp: String,
    /// Display category
    #[serde(rename = "type")]
    pub kind: LogKind,
    /// Final display message
    pub message: String,
    /// Hidden from the default operator view when true
    pub is_technical: bool,
    /// The extracted payload this record was built from
    pub original_event: Value,
}

impl CanonicalLogRecord {
    /// Build a record with a fresh id and the current display time
    pub fn new(
        kind: LogKind,
        message: impl Into<String>,
        is_technical: bool,
        original_event: Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            kind,
            message: message.into(),
            is_technical,
            original_event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_ids_are_unique() {
        let a = CanonicalLogRecord::new(LogKind::Info, "a", false, json!({}));
        let b = CanonicalLogRecord::new(LogKind::Info, "b", false, json!({}));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn record_serializes_with_contract_field_names() {
        let record = CanonicalLogRecord::new(
            LogKind::StepProgress,
            "Step 1: Connect",
            false,
            json!({"event_type": "STEP_START"}),
        );

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "STEP_PROGRESS");
        assert_eq!(value["message"], "Step 1: Connect");
        assert_eq!(value["isTechnical"], false);
        assert_eq!(value["originalEvent"]["event_type"], "STEP_START");
        assert!(value["id"].is_string());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn log_kind_round_trips() {
        for kind in [
            LogKind::Info,
            LogKind::Success,
            LogKind::Error,
            LogKind::StepProgress,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json.trim_matches('"'), kind.to_string());
            let back: LogKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }
}

// Transport input boundary
//
// Frames arrive one at a time from a transport collaborator the core does
// not own. Connection-status notifications are passed through to the
// display collaborator uninterpreted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Connection status reported by the transport collaborator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// One raw frame from the transport, with no guaranteed shape
#[derive(Debug, Clone, PartialEq)]
pub enum RawFrame {
    /// Opaque text, possibly JSON, possibly free text
    Text(String),
    /// Already-parsed object delivered by the transport
    Json(Value),
    /// Connection-status notification (pass-through)
    Status(ConnectionStatus),
}

impl From<&str> for RawFrame {
    fn from(s: &str) -> Self {
        RawFrame::Text(s.to_string())
    }
}

impl From<String> for RawFrame {
    fn from(s: String) -> Self {
        RawFrame::Text(s)
    }
}

impl From<Value> for RawFrame {
    fn from(v: Value) -> Self {
        RawFrame::Json(v)
    }
}

// Payload extraction
//
// The transport delivers an inconsistent mix of double-encoded JSON, JSON
// embedded as a substring inside free text, and plain text. PayloadExtractor
// unwraps all of it into a flat event payload. It never fails: anything
// unparseable degrades to a plain LOG_MESSAGE payload carrying the raw text.

use serde_json::{json, Map, Value};
use thiserror::Error;

use upline_contracts::{ConnectionStatus, RawFrame, EVENT_LOG_MESSAGE};

use crate::config::PipelineConfig;

/// Marker tokens that signal an event serialized into a free-text line
const EMBEDDED_MARKERS: &[&str] = &["PRE_CHECK_EVENT:", "UPGRADE_EVENT:", r#"{"event_type""#];

/// Embedded JSON was located by the brace scan but did not parse
#[derive(Debug, Clone, Error, PartialEq)]
#[error("embedded JSON parse failure: {reason}")]
pub struct EmbeddedJsonError {
    /// Truncated slice of the raw text around the failed match
    pub excerpt: String,
    /// Parser error text
    pub reason: String,
}

/// Result of extraction: a best-effort payload plus an optional diagnostic
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub payload: Value,
    pub embedded_error: Option<EmbeddedJsonError>,
}

/// Unwraps nested/double-encoded envelopes and text-embedded JSON
#[derive(Debug, Clone, Default)]
pub struct PayloadExtractor {
    config: PipelineConfig,
}

impl PayloadExtractor {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Extract the most deeply unwrapped payload from a raw frame
    ///
    /// Idempotent on already-flat input: a well-formed object with no
    /// `data` wrapper and no embedded marker is returned unchanged.
    pub fn extract(&self, raw: &RawFrame) -> Extraction {
        // Unparseable text becomes a LOG_MESSAGE wrapper; the loop below may
        // still find an event embedded in its message text.
        let mut current = match raw {
            RawFrame::Text(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => Value::Object(map),
                _ => plain_log(text),
            },
            RawFrame::Json(value) if value.is_object() => value.clone(),
            RawFrame::Json(value) => plain_log(&value.to_string()),
            RawFrame::Status(status) => status_log(*status),
        };

        let mut embedded_error = None;
        for _ in 0..self.config.max_unwrap_depth {
            match self.unwrap_data(&current) {
                DataUnwrap::Descend(inner) => {
                    current = inner;
                    continue;
                }
                DataUnwrap::Resolved(resolved) => {
                    current = resolved;
                }
                DataUnwrap::None => {}
            }

            match self.unwrap_embedded(&current) {
                EmbeddedUnwrap::Event(inner) => {
                    current = inner;
                    continue;
                }
                EmbeddedUnwrap::Failed(err) => {
                    embedded_error = Some(err);
                    break;
                }
                EmbeddedUnwrap::None => break,
            }
        }

        Extraction { payload: current, embedded_error }
    }

    /// Resolve a `data` field that may itself be a re-serialized event
    ///
    /// Descends only when the resolved data carries its own `event_type`
    /// and the envelope does not, which is the double-encoded case. A
    /// parseable data string without `event_type` is resolved in place.
    fn unwrap_data(&self, current: &Value) -> DataUnwrap {
        let obj = match current.as_object() {
            Some(obj) => obj,
            None => return DataUnwrap::None,
        };
        let data = match obj.get("data") {
            Some(data) => data,
            None => return DataUnwrap::None,
        };
        let envelope_has_type = obj.get("event_type").is_some();

        match data {
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(parsed) => {
                    if !envelope_has_type && is_event_object(&parsed) {
                        DataUnwrap::Descend(parsed)
                    } else {
                        let mut resolved: Map<String, Value> = obj.clone();
                        resolved.insert("data".to_string(), parsed);
                        DataUnwrap::Resolved(Value::Object(resolved))
                    }
                }
                // Unparseable data string: keep the original object
                Err(_) => DataUnwrap::None,
            },
            Value::Object(_) if !envelope_has_type && is_event_object(data) => {
                DataUnwrap::Descend(data.clone())
            }
            _ => DataUnwrap::None,
        }
    }

    /// Locate and parse an event serialized into a wrapper's message text
    fn unwrap_embedded(&self, current: &Value) -> EmbeddedUnwrap {
        let obj = match current.as_object() {
            Some(obj) => obj,
            None => return EmbeddedUnwrap::None,
        };
        // Only wrapped free-text lines carry embedded events
        if obj.get("event_type").and_then(Value::as_str) != Some(EVENT_LOG_MESSAGE) {
            return EmbeddedUnwrap::None;
        }
        let message = match obj.get("message").and_then(Value::as_str) {
            Some(message) => message,
            None => return EmbeddedUnwrap::None,
        };

        let marker_at = EMBEDDED_MARKERS
            .iter()
            .filter_map(|marker| message.find(marker).map(|at| at + marker_offset(marker)))
            .min();
        let scan_from = match marker_at {
            Some(at) => at,
            None => return EmbeddedUnwrap::None,
        };

        // No balanced match: keep the wrapper unchanged, do not guess
        let candidate = match find_balanced_object(message, scan_from) {
            Some(candidate) => candidate,
            None => return EmbeddedUnwrap::None,
        };

        match serde_json::from_str::<Value>(candidate) {
            Ok(parsed) => EmbeddedUnwrap::Event(parsed),
            Err(err) => EmbeddedUnwrap::Failed(EmbeddedJsonError {
                excerpt: truncate(candidate, self.config.max_excerpt_len),
                reason: err.to_string(),
            }),
        }
    }
}

enum DataUnwrap {
    /// The resolved data replaces the envelope entirely
    Descend(Value),
    /// The envelope is kept with its data field parsed in place
    Resolved(Value),
    None,
}

enum EmbeddedUnwrap {
    Event(Value),
    Failed(EmbeddedJsonError),
    None,
}

/// Scan for a balanced JSON object starting at or after `from`
///
/// Walks character by character, toggling an inside-string flag on
/// unescaped quotes and skipping the character after a backslash; braces
/// are only counted outside strings. Returns the substring from the first
/// unmatched `{` to the position where the running count returns to zero.
pub fn find_balanced_object(text: &str, from: usize) -> Option<&str> {
    let start = text[from..].find('{').map(|at| from + at)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut skip_next = false;
    for (at, ch) in text[start..].char_indices() {
        if skip_next {
            skip_next = false;
            continue;
        }
        match ch {
            '\\' => skip_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + at + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// True for an object that looks like a complete event of its own
fn is_event_object(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| obj.contains_key("event_type"))
        .unwrap_or(false)
}

/// Scan start offset for a marker: the brace-prefix marker is itself JSON
fn marker_offset(marker: &str) -> usize {
    if marker.starts_with('{') {
        0
    } else {
        marker.len()
    }
}

fn plain_log(text: &str) -> Value {
    json!({ "message": text, "event_type": EVENT_LOG_MESSAGE })
}

fn status_log(status: ConnectionStatus) -> Value {
    json!({ "message": status.to_string(), "event_type": EVENT_LOG_MESSAGE })
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(raw: impl Into<RawFrame>) -> Extraction {
        PayloadExtractor::new(PipelineConfig::default()).extract(&raw.into())
    }

    #[test]
    fn plain_text_degrades_to_log_message() {
        let out = extract("device rebooting now");
        assert_eq!(out.payload["event_type"], "LOG_MESSAGE");
        assert_eq!(out.payload["message"], "device rebooting now");
        assert!(out.embedded_error.is_none());
    }

    #[test]
    fn flat_object_is_returned_unchanged() {
        let flat = json!({
            "event_type": "STEP_START",
            "message": "Step 1: Connecting",
            "data": { "step": 1 }
        });
        let out = extract(flat.clone());
        assert_eq!(out.payload, flat);
    }

    #[test]
    fn extraction_is_idempotent() {
        let flat = json!({ "event_type": "OPERATION_START", "message": "Starting" });
        let once = extract(flat).payload;
        let twice = extract(once.clone()).payload;
        assert_eq!(once, twice);
    }

    #[test]
    fn double_encoded_data_is_unwrapped() {
        let out = extract(r#"{"data":"{\"event_type\":\"X\"}"}"#);
        assert_eq!(out.payload, json!({ "event_type": "X" }));
    }

    #[test]
    fn data_object_event_is_unwrapped() {
        let out = extract(json!({
            "type": "event",
            "data": { "event_type": "PROGRESS_UPDATE", "data": { "progress": 50 } }
        }));
        assert_eq!(out.payload["event_type"], "PROGRESS_UPDATE");
        assert_eq!(out.payload["data"]["progress"], 50);
    }

    #[test]
    fn envelope_with_own_event_type_keeps_its_data() {
        let envelope = json!({
            "event_type": "PRE_CHECK_COMPLETE",
            "data": { "validation_passed": true }
        });
        let out = extract(envelope.clone());
        assert_eq!(out.payload, envelope);
    }

    #[test]
    fn parseable_data_string_without_event_type_is_resolved_in_place() {
        let out = extract(json!({
            "event_type": "PRE_CHECK_COMPLETE",
            "data": "{\"validation_passed\": false}"
        }));
        assert_eq!(out.payload["event_type"], "PRE_CHECK_COMPLETE");
        assert_eq!(out.payload["data"]["validation_passed"], false);
    }

    #[test]
    fn brace_scan_ignores_braces_inside_strings() {
        let text = r#"PRE_CHECK_EVENT:{"a":{"b":1},"c":"}"}trailing"#;
        let found = find_balanced_object(text, "PRE_CHECK_EVENT:".len()).unwrap();
        assert_eq!(found, r#"{"a":{"b":1},"c":"}"}"#);
    }

    #[test]
    fn brace_scan_skips_escaped_quotes() {
        let text = r#"noise {"msg":"say \"hi\" {now}","n":2} tail"#;
        let found = find_balanced_object(text, 0).unwrap();
        assert_eq!(found, r#"{"msg":"say \"hi\" {now}","n":2}"#);
    }

    #[test]
    fn brace_scan_returns_none_when_unbalanced() {
        assert_eq!(find_balanced_object(r#"start {"open": true"#, 0), None);
    }

    #[test]
    fn embedded_event_in_log_message_is_extracted() {
        let wrapper = format!(
            r#"2025-01-01 INFO worker: PRE_CHECK_EVENT:{} done"#,
            r#"{"event_type":"PRE_CHECK_COMPLETE","data":{"validation_passed":true}}"#
        );
        let out = extract(wrapper.as_str());
        assert_eq!(out.payload["event_type"], "PRE_CHECK_COMPLETE");
        assert_eq!(out.payload["data"]["validation_passed"], true);
        assert!(out.embedded_error.is_none());
    }

    #[test]
    fn bare_event_type_marker_is_extracted_from_free_text() {
        let out = extract(r#"stderr said {"event_type":"UPLOAD_COMPLETE","success":true} ok"#);
        assert_eq!(out.payload["event_type"], "UPLOAD_COMPLETE");
    }

    #[test]
    fn unbalanced_embedded_json_keeps_the_wrapper() {
        let raw = r#"worker log PRE_CHECK_EVENT:{"a": {"b": 1"#;
        let out = extract(raw);
        assert_eq!(out.payload["event_type"], "LOG_MESSAGE");
        assert_eq!(out.payload["message"], raw);
        assert!(out.embedded_error.is_none());
    }

    #[test]
    fn invalid_embedded_json_reports_a_diagnostic() {
        // Balanced braces, but not valid JSON
        let raw = r#"worker log PRE_CHECK_EVENT:{bad json here}"#;
        let out = extract(raw);
        assert_eq!(out.payload["event_type"], "LOG_MESSAGE");
        let err = out.embedded_error.expect("diagnostic expected");
        assert_eq!(err.excerpt, "{bad json here}");
        assert!(!err.reason.is_empty());
    }

    #[test]
    fn diagnostic_excerpt_is_bounded() {
        let filler = "x".repeat(400);
        let raw = format!(r#"PRE_CHECK_EVENT:{{bad {filler}}}"#);
        let config = PipelineConfig::default().with_max_excerpt_len(50);
        let out = PayloadExtractor::new(config).extract(&RawFrame::Text(raw));
        let err = out.embedded_error.expect("diagnostic expected");
        assert!(err.excerpt.len() <= 53); // bound plus ellipsis
    }

    #[test]
    fn status_frames_degrade_to_log_messages() {
        let out = extract_status(ConnectionStatus::Disconnected);
        assert_eq!(out.payload["event_type"], "LOG_MESSAGE");
        assert_eq!(out.payload["message"], "disconnected");
    }

    fn extract_status(status: ConnectionStatus) -> Extraction {
        PayloadExtractor::new(PipelineConfig::default()).extract(&RawFrame::Status(status))
    }
}

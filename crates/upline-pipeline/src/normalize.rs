// Log normalization
//
// LogNormalizer orchestrates extraction, diagnostic validation, and noise
// classification into one canonical, display-ready record per raw event.
//
// Formatting is a registry keyed by EventTag. The tag enum is matched
// exhaustively, so adding a tag without a formatter arm fails to compile.

use serde_json::{json, Value};
use tracing::{debug, warn};

use upline_contracts::{
    events as event_types, is_always_visible, CanonicalLogRecord, LogKind, RawFrame,
};

use crate::config::PipelineConfig;
use crate::extract::{EmbeddedJsonError, PayloadExtractor};
use crate::{noise, schema};

/// Event-type tags with dedicated formatting rules
///
/// Everything else flows through `Other`, which applies the generic
/// ERROR/SUCCESS-substring and success-flag fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTag {
    PreCheckComplete,
    StepStart,
    StepComplete,
    OperationStart,
    OperationComplete,
    UploadStart,
    UploadComplete,
    ProgressUpdate,
    LogMessage,
    Other,
}

impl EventTag {
    pub fn from_event_type(event_type: &str) -> Self {
        match event_type {
            event_types::EVENT_PRE_CHECK_COMPLETE => EventTag::PreCheckComplete,
            event_types::EVENT_STEP_START => EventTag::StepStart,
            event_types::EVENT_STEP_COMPLETE => EventTag::StepComplete,
            event_types::EVENT_OPERATION_START => EventTag::OperationStart,
            event_types::EVENT_OPERATION_COMPLETE => EventTag::OperationComplete,
            event_types::EVENT_UPLOAD_START => EventTag::UploadStart,
            event_types::EVENT_UPLOAD_COMPLETE => EventTag::UploadComplete,
            event_types::EVENT_PROGRESS_UPDATE => EventTag::ProgressUpdate,
            event_types::EVENT_LOG_MESSAGE => EventTag::LogMessage,
            _ => EventTag::Other,
        }
    }
}

/// Output of normalizing one raw frame
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// The primary record for this frame
    pub record: CanonicalLogRecord,
    /// Visible diagnostic when embedded JSON was located but unparseable
    pub parse_error: Option<CanonicalLogRecord>,
}

/// Turns raw frames into canonical log records
#[derive(Debug, Clone, Default)]
pub struct LogNormalizer {
    extractor: PayloadExtractor,
}

impl LogNormalizer {
    pub fn new(config: PipelineConfig) -> Self {
        Self { extractor: PayloadExtractor::new(config) }
    }

    /// Normalize one raw frame into a canonical record
    pub fn normalize(&self, raw: &RawFrame) -> Normalized {
        let extraction = self.extractor.extract(raw);
        let payload = extraction.payload;

        let event_type = payload
            .get("event_type")
            .and_then(Value::as_str)
            .unwrap_or(event_types::EVENT_UNKNOWN)
            .to_string();

        // Keep the pre-formatting message for noise classification
        let original_message = payload
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| payload.to_string());

        let report = schema::validate(&payload, Some(&event_type));
        if !report.is_valid {
            if event_types::is_recognized(&event_type) {
                warn!(%event_type, errors = ?report.errors, "event failed schema validation");
            } else {
                debug!(%event_type, errors = ?report.errors, "unrecognized event type");
            }
        }

        let (kind, message) = format_message(&event_type, &payload, &original_message);
        // A record's message is never empty
        let message = if message.trim().is_empty() { payload.to_string() } else { message };

        let is_technical = classify(&event_type, &original_message);
        let record = CanonicalLogRecord::new(kind, message, is_technical, payload);

        let parse_error = extraction.embedded_error.map(parse_error_record);
        Normalized { record, parse_error }
    }
}

/// Visibility policy, applied in documented order:
/// always-visible allow-list, then noise, then user-facing, then hidden.
fn classify(event_type: &str, original_message: &str) -> bool {
    if is_always_visible(event_type) {
        return false;
    }
    if noise::is_noise(original_message) {
        return true;
    }
    if noise::is_user_facing(original_message) {
        return false;
    }
    true
}

/// The formatting registry: first-match-wins on the event tag
fn format_message(event_type: &str, payload: &Value, original_message: &str) -> (LogKind, String) {
    match EventTag::from_event_type(event_type) {
        EventTag::PreCheckComplete => format_pre_check_complete(payload, original_message),
        EventTag::StepStart => format_step_start(payload),
        EventTag::StepComplete => format_step_complete(payload),
        EventTag::OperationStart => (
            LogKind::Info,
            explicit_message(payload).unwrap_or_else(|| {
                format!(
                    "Starting operation: {}",
                    data_str(payload, "operation").unwrap_or("Unknown")
                )
            }),
        ),
        EventTag::OperationComplete => format_operation_complete(payload),
        EventTag::UploadStart => (
            LogKind::Info,
            explicit_message(payload).unwrap_or_else(|| "Upload started".to_string()),
        ),
        EventTag::UploadComplete => (
            LogKind::Success,
            explicit_message(payload)
                .unwrap_or_else(|| "Upload completed successfully".to_string()),
        ),
        EventTag::ProgressUpdate => format_progress_update(payload, original_message),
        EventTag::LogMessage => format_log_message(payload, original_message),
        EventTag::Other => format_other(event_type, payload, original_message),
    }
}

/// Tri-state on data.validation_passed: true, false, or absent
fn format_pre_check_complete(payload: &Value, original_message: &str) -> (LogKind, String) {
    match data_bool(payload, "validation_passed") {
        Some(true) => {
            let message = explicit_message(payload).unwrap_or_else(|| {
                match (data_f64(payload, "required_mb"), data_f64(payload, "available_mb")) {
                    (Some(required), Some(available)) => format!(
                        "\u{2705} Validation passed: {} MB required, {} MB available",
                        to_fixed(required, 2),
                        to_fixed(available, 2)
                    ),
                    _ => "\u{2705} Pre-check validation passed".to_string(),
                }
            });
            (LogKind::Success, message)
        }
        Some(false) => {
            let mut message = explicit_message(payload)
                .or_else(|| first_test_result_error(payload))
                .unwrap_or_else(|| "\u{274C} Pre-check validation failed".to_string());
            for recommendation in recommendations(payload) {
                message.push_str("\n\u{2022} ");
                message.push_str(&recommendation);
            }
            (LogKind::Error, message)
        }
        None => (
            LogKind::Info,
            explicit_message(payload).unwrap_or_else(|| original_message.to_string()),
        ),
    }
}

fn format_step_start(payload: &Value) -> (LogKind, String) {
    let message = explicit_message(payload).unwrap_or_else(|| {
        let step = data_value(payload, "step").and_then(display_number);
        let label = data_str(payload, "description").or_else(|| data_str(payload, "name"));
        match (step, label) {
            (Some(step), Some(label)) => format!("Step {step}: {label}"),
            _ => "Processing...".to_string(),
        }
    });
    (LogKind::StepProgress, message)
}

fn format_step_complete(payload: &Value) -> (LogKind, String) {
    let label = data_str(payload, "name")
        .map(str::to_string)
        .or_else(|| data_str(payload, "description").map(str::to_string))
        .or_else(|| {
            data_value(payload, "step")
                .and_then(display_number)
                .map(|step| format!("Step {step}"))
        });

    let message = match label {
        Some(label) => match data_f64(payload, "duration") {
            Some(duration) => format!("Completed: {label} ({}s)", to_fixed(duration, 1)),
            None => format!("Completed: {label}"),
        },
        None => explicit_message(payload).unwrap_or_else(|| "Step completed".to_string()),
    };
    (LogKind::Success, message)
}

/// Success unless data.success is exactly false or data.status is FAILED
fn format_operation_complete(payload: &Value) -> (LogKind, String) {
    let succeeded =
        data_bool(payload, "success") != Some(false) && data_str(payload, "status") != Some("FAILED");

    if succeeded {
        (
            LogKind::Success,
            explicit_message(payload)
                .unwrap_or_else(|| "Operation completed successfully".to_string()),
        )
    } else {
        let message = explicit_message(payload)
            .or_else(|| data_str(payload, "error").map(str::to_string))
            .or_else(|| data_str(payload, "message").map(str::to_string))
            .unwrap_or_else(|| "Operation failed".to_string());
        (LogKind::Error, message)
    }
}

fn format_progress_update(payload: &Value, original_message: &str) -> (LogKind, String) {
    let message = explicit_message(payload).unwrap_or_else(|| {
        match data_f64(payload, "progress") {
            Some(progress) => format!("Progress: {}%", to_fixed(progress, 1)),
            None => original_message.to_string(),
        }
    });
    (LogKind::Info, message)
}

/// Display kind is derived from the log level
fn format_log_message(payload: &Value, original_message: &str) -> (LogKind, String) {
    let level = payload
        .get("level")
        .and_then(Value::as_str)
        .map(str::to_uppercase)
        .unwrap_or_default();
    let kind = match level.as_str() {
        "ERROR" | "CRITICAL" => LogKind::Error,
        "SUCCESS" => LogKind::Success,
        _ => LogKind::Info,
    };
    let message = explicit_message(payload).unwrap_or_else(|| original_message.to_string());
    (kind, message)
}

/// Generic fallbacks for unlisted event types, in table order:
/// ERROR-named or success===false, then SUCCESS-named or success===true,
/// then plain INFO.
fn format_other(event_type: &str, payload: &Value, original_message: &str) -> (LogKind, String) {
    let success_flag = payload.get("success").and_then(Value::as_bool);

    if event_type.contains("ERROR") || success_flag == Some(false) {
        let message = explicit_message(payload)
            .or_else(|| data_str(payload, "error").map(str::to_string))
            .or_else(|| data_str(payload, "message").map(str::to_string))
            .unwrap_or_else(|| "An error occurred".to_string());
        return (LogKind::Error, message);
    }

    if event_type.contains("SUCCESS") || success_flag == Some(true) {
        let message = explicit_message(payload)
            .unwrap_or_else(|| "Operation completed successfully".to_string());
        return (LogKind::Success, message);
    }

    (
        LogKind::Info,
        explicit_message(payload).unwrap_or_else(|| original_message.to_string()),
    )
}

/// Visible PARSE_ERROR record for a failed embedded-JSON extraction
fn parse_error_record(error: EmbeddedJsonError) -> CanonicalLogRecord {
    let message = format!(
        "\u{26A0}\u{FE0F} Failed to parse embedded event: {} (excerpt: {})",
        error.reason, error.excerpt
    );
    let original_event = json!({
        "event_type": event_types::EVENT_PARSE_ERROR,
        "error": error.reason,
        "excerpt": error.excerpt,
    });
    CanonicalLogRecord::new(LogKind::Error, message, false, original_event)
}

// Payload accessors

fn explicit_message(payload: &Value) -> Option<String> {
    payload
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
}

fn data_value<'a>(payload: &'a Value, field: &str) -> Option<&'a Value> {
    payload.get("data").and_then(|data| data.get(field))
}

fn data_str<'a>(payload: &'a Value, field: &str) -> Option<&'a str> {
    data_value(payload, field).and_then(Value::as_str)
}

fn data_bool(payload: &Value, field: &str) -> Option<bool> {
    data_value(payload, field).and_then(Value::as_bool)
}

fn data_f64(payload: &Value, field: &str) -> Option<f64> {
    data_value(payload, field).and_then(Value::as_f64)
}

/// Fixed-point rendering that rounds halves away from zero
///
/// The standard formatter rounds half to even; downstream consumers
/// compare against display strings produced with away-from-zero halves,
/// so 42.25 must render as "42.3" at one decimal.
fn to_fixed(value: f64, digits: usize) -> String {
    let factor = 10f64.powi(digits as i32);
    let rounded = (value.abs() * factor + 0.5).floor() / factor;
    let rounded = if value.is_sign_negative() { -rounded } else { rounded };
    format!("{rounded:.digits$}")
}

/// Render a step number without a trailing fraction
fn display_number(value: &Value) -> Option<String> {
    if let Some(n) = value.as_i64() {
        return Some(n.to_string());
    }
    if let Some(n) = value.as_f64() {
        return Some(format!("{n}"));
    }
    value.as_str().map(str::to_string)
}

/// First nested test-result error from data.results / data.test_results
fn first_test_result_error(payload: &Value) -> Option<String> {
    for field in ["results", "test_results"] {
        let entries = match data_value(payload, field).and_then(Value::as_array) {
            Some(entries) => entries,
            None => continue,
        };
        for entry in entries {
            if let Some(error) = entry.get("error").and_then(Value::as_str) {
                return Some(error.to_string());
            }
            if entry.get("passed").and_then(Value::as_bool) == Some(false) {
                if let Some(message) = entry.get("message").and_then(Value::as_str) {
                    return Some(message.to_string());
                }
            }
        }
    }
    None
}

/// Bulleted recommendations carried by a failed pre-check
fn recommendations(payload: &Value) -> Vec<String> {
    data_value(payload, "recommendations")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

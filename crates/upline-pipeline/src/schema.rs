// Event schema validation
//
// One named contract per recognized event type: required/optional
// top-level fields plus a typed contract for the nested `data` object.
// Validation is purely diagnostic: it reports, it never blocks
// normalization and never mutates the payload.
//
// Field contracts mirror the gateway-side message schemas the automation
// jobs publish against.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

use upline_contracts::events as event_types;

/// Declared type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Number => write!(f, "number"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Object => write!(f, "object"),
            FieldType::Array => write!(f, "array"),
        }
    }
}

/// Contract for a single `data` field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub kind: FieldType,
    pub allowed: &'static [&'static str],
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FieldSpec {
    pub fn of(kind: FieldType) -> Self {
        Self { kind, allowed: &[], min: None, max: None }
    }

    pub fn with_enum(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = allowed;
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }
}

/// Contract for the nested `data` object
#[derive(Debug, Clone, Default)]
pub struct DataSchema {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    pub properties: Vec<(&'static str, FieldSpec)>,
}

/// Named contract for one event type
#[derive(Debug, Clone)]
pub struct EventSchema {
    pub event_type: &'static str,
    pub required_top: &'static [&'static str],
    pub optional_top: &'static [&'static str],
    /// Typed contracts for top-level fields, checked when present
    pub top_properties: Vec<(&'static str, FieldSpec)>,
    pub data: Option<DataSchema>,
}

/// Outcome of validating one payload
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub event_type: Option<String>,
}

const COMMON_TOP: &[&str] = &["event_type", "timestamp"];
const COMMON_OPTIONAL_TOP: &[&str] = &["job_id", "message", "data", "success", "level", "status"];

fn schema(event_type: &'static str, data: Option<DataSchema>) -> EventSchema {
    EventSchema {
        event_type,
        required_top: COMMON_TOP,
        optional_top: COMMON_OPTIONAL_TOP,
        top_properties: Vec::new(),
        data,
    }
}

/// The schema registry, built once
pub fn registry() -> &'static HashMap<&'static str, EventSchema> {
    static REGISTRY: OnceLock<HashMap<&'static str, EventSchema>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let schemas = vec![
            schema(
                event_types::EVENT_PROGRESS_UPDATE,
                Some(DataSchema {
                    required: &["progress"],
                    optional: &["message", "step"],
                    properties: vec![(
                        "progress",
                        FieldSpec::of(FieldType::Number).with_range(0.0, 100.0),
                    )],
                }),
            ),
            schema(
                event_types::EVENT_UPLOAD_START,
                Some(DataSchema {
                    required: &[],
                    optional: &["filename", "size_mb"],
                    properties: vec![
                        ("filename", FieldSpec::of(FieldType::String)),
                        ("size_mb", FieldSpec::of(FieldType::Number).with_min(0.0)),
                    ],
                }),
            ),
            schema(
                event_types::EVENT_UPLOAD_COMPLETE,
                Some(DataSchema {
                    required: &[],
                    optional: &["filename", "success", "duration"],
                    properties: vec![
                        ("filename", FieldSpec::of(FieldType::String)),
                        ("success", FieldSpec::of(FieldType::Boolean)),
                        ("duration", FieldSpec::of(FieldType::Number).with_min(0.0)),
                    ],
                }),
            ),
            schema(
                event_types::EVENT_PRE_CHECK_COMPLETE,
                Some(DataSchema {
                    required: &["validation_passed"],
                    optional: &["required_mb", "available_mb", "message", "results", "recommendations"],
                    properties: vec![
                        ("validation_passed", FieldSpec::of(FieldType::Boolean)),
                        ("required_mb", FieldSpec::of(FieldType::Number).with_min(0.0)),
                        ("available_mb", FieldSpec::of(FieldType::Number).with_min(0.0)),
                        ("results", FieldSpec::of(FieldType::Array)),
                        ("recommendations", FieldSpec::of(FieldType::Array)),
                    ],
                }),
            ),
            schema(
                event_types::EVENT_PRE_CHECK_RESULT,
                Some(DataSchema {
                    required: &["check_name", "passed"],
                    optional: &["severity", "message", "recommendation"],
                    properties: vec![
                        ("check_name", FieldSpec::of(FieldType::String)),
                        ("passed", FieldSpec::of(FieldType::Boolean)),
                        (
                            "severity",
                            FieldSpec::of(FieldType::String)
                                .with_enum(&["pass", "warning", "critical", "info"]),
                        ),
                        ("message", FieldSpec::of(FieldType::String)),
                    ],
                }),
            ),
            schema(
                event_types::EVENT_OPERATION_START,
                Some(DataSchema {
                    required: &[],
                    optional: &["operation", "message"],
                    properties: vec![("operation", FieldSpec::of(FieldType::String))],
                }),
            ),
            schema(
                event_types::EVENT_OPERATION_COMPLETE,
                Some(DataSchema {
                    required: &[],
                    optional: &["success", "status", "error", "message", "operation"],
                    properties: vec![
                        ("success", FieldSpec::of(FieldType::Boolean)),
                        ("status", FieldSpec::of(FieldType::String)),
                        ("error", FieldSpec::of(FieldType::String)),
                    ],
                }),
            ),
            schema(
                event_types::EVENT_STEP_START,
                Some(DataSchema {
                    required: &[],
                    optional: &["step", "name", "description"],
                    properties: vec![
                        ("step", FieldSpec::of(FieldType::Number).with_min(0.0)),
                        ("name", FieldSpec::of(FieldType::String)),
                        ("description", FieldSpec::of(FieldType::String)),
                    ],
                }),
            ),
            schema(
                event_types::EVENT_STEP_COMPLETE,
                Some(DataSchema {
                    required: &[],
                    optional: &["step", "name", "description", "duration"],
                    properties: vec![
                        ("step", FieldSpec::of(FieldType::Number).with_min(0.0)),
                        ("name", FieldSpec::of(FieldType::String)),
                        ("duration", FieldSpec::of(FieldType::Number).with_min(0.0)),
                    ],
                }),
            ),
            schema(
                event_types::EVENT_STEP_PROGRESS,
                Some(DataSchema {
                    required: &[],
                    optional: &["step", "message", "progress"],
                    properties: vec![(
                        "progress",
                        FieldSpec::of(FieldType::Number).with_range(0.0, 100.0),
                    )],
                }),
            ),
            schema(
                event_types::EVENT_DEVICE_PROGRESS,
                Some(DataSchema {
                    required: &["device"],
                    optional: &["phase", "step", "total_steps", "message"],
                    properties: vec![
                        ("device", FieldSpec::of(FieldType::String)),
                        ("step", FieldSpec::of(FieldType::Number).with_min(0.0)),
                        ("total_steps", FieldSpec::of(FieldType::Number).with_min(0.0)),
                        ("phase", FieldSpec::of(FieldType::String)),
                    ],
                }),
            ),
            schema(
                event_types::EVENT_UPGRADE_PROGRESS,
                Some(DataSchema {
                    required: &["step", "status"],
                    optional: &["progress", "message", "current_version", "target_version"],
                    properties: vec![
                        ("step", FieldSpec::of(FieldType::String)),
                        ("status", FieldSpec::of(FieldType::String)),
                        (
                            "progress",
                            FieldSpec::of(FieldType::Number).with_range(0.0, 100.0),
                        ),
                    ],
                }),
            ),
            EventSchema {
                event_type: event_types::EVENT_LOG_MESSAGE,
                required_top: &["event_type", "message"],
                optional_top: &["level", "timestamp", "job_id", "data"],
                top_properties: vec![
                    (
                        "level",
                        FieldSpec::of(FieldType::String).with_enum(&[
                            "DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "SUCCESS",
                        ]),
                    ),
                    ("message", FieldSpec::of(FieldType::String)),
                ],
                data: None,
            },
            schema(
                event_types::EVENT_TEMPLATE_DEPLOY_START,
                Some(DataSchema {
                    required: &[],
                    optional: &["template", "device"],
                    properties: vec![
                        ("template", FieldSpec::of(FieldType::String)),
                        ("device", FieldSpec::of(FieldType::String)),
                    ],
                }),
            ),
            schema(
                event_types::EVENT_TEMPLATE_DEPLOY_PROGRESS,
                Some(DataSchema {
                    required: &[],
                    optional: &["progress", "message"],
                    properties: vec![(
                        "progress",
                        FieldSpec::of(FieldType::Number).with_range(0.0, 100.0),
                    )],
                }),
            ),
            schema(
                event_types::EVENT_TEMPLATE_DEPLOY_COMPLETE,
                Some(DataSchema {
                    required: &[],
                    optional: &["success", "message"],
                    properties: vec![("success", FieldSpec::of(FieldType::Boolean))],
                }),
            ),
            schema(
                event_types::EVENT_TEMPLATE_VALIDATION_RESULT,
                Some(DataSchema {
                    required: &[],
                    optional: &["passed", "errors"],
                    properties: vec![
                        ("passed", FieldSpec::of(FieldType::Boolean)),
                        ("errors", FieldSpec::of(FieldType::Array)),
                    ],
                }),
            ),
            schema(
                event_types::EVENT_TEMPLATE_DIFF_GENERATED,
                Some(DataSchema {
                    required: &[],
                    optional: &["diff", "lines_changed"],
                    properties: vec![
                        ("diff", FieldSpec::of(FieldType::String)),
                        ("lines_changed", FieldSpec::of(FieldType::Number).with_min(0.0)),
                    ],
                }),
            ),
        ];

        schemas.into_iter().map(|schema| (schema.event_type, schema)).collect()
    })
}

/// Validate a payload against its event-type contract
///
/// The event type is resolved from the hint, falling back to the
/// payload's own `event_type` field. Unknown types are an explicit
/// validation error, never a silent pass.
pub fn validate(message: &Value, event_type_hint: Option<&str>) -> ValidationReport {
    let mut errors = Vec::new();

    let event_type = event_type_hint
        .map(str::to_string)
        .or_else(|| message.get("event_type").and_then(Value::as_str).map(str::to_string));

    let event_type = match event_type {
        Some(event_type) => event_type,
        None => {
            return ValidationReport {
                is_valid: false,
                errors: vec!["Missing event type".to_string()],
                event_type: None,
            }
        }
    };

    let schema = match registry().get(event_type.as_str()) {
        Some(schema) => schema,
        None => {
            return ValidationReport {
                is_valid: false,
                errors: vec![format!("Unknown event type: {event_type}")],
                event_type: Some(event_type),
            }
        }
    };

    for field in schema.required_top {
        if message.get(*field).is_none() {
            errors.push(format!("Missing required field: {field}"));
        }
    }

    for (name, spec) in &schema.top_properties {
        if let Some(value) = message.get(*name) {
            check_field(name, value, spec, &mut errors);
        }
    }

    if let Some(data_schema) = &schema.data {
        match message.get("data") {
            Some(Value::Object(data)) => {
                for field in data_schema.required {
                    if !data.contains_key(*field) {
                        errors.push(format!("Missing required data field: {field}"));
                    }
                }
                for (name, spec) in &data_schema.properties {
                    if let Some(value) = data.get(*name) {
                        check_field(name, value, spec, &mut errors);
                    }
                }
            }
            Some(other) => {
                errors.push(format!("Field data must be an object, got {}", kind_of(other)));
            }
            None => {
                if !data_schema.required.is_empty() {
                    errors.push("Missing required field: data".to_string());
                }
            }
        }
    }

    ValidationReport { is_valid: errors.is_empty(), errors, event_type: Some(event_type) }
}

/// Check one declared field against its spec
fn check_field(name: &str, value: &Value, spec: &FieldSpec, errors: &mut Vec<String>) {
    let numeric = numeric_value(value);

    let type_ok = match spec.kind {
        FieldType::String => value.is_string(),
        // Numeric strings pass only when unambiguously convertible;
        // the stored value is never coerced.
        FieldType::Number => numeric.is_some(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Object => value.is_object(),
        FieldType::Array => value.is_array(),
    };
    if !type_ok {
        errors.push(format!(
            "Field {name} must be a {}, got {}",
            spec.kind,
            kind_of(value)
        ));
        return;
    }

    if !spec.allowed.is_empty() {
        if let Some(text) = value.as_str() {
            if !spec.allowed.contains(&text) {
                errors.push(format!("Field {name} must be one of {:?}, got {text:?}", spec.allowed));
            }
        }
    }

    if let Some(number) = numeric {
        if let Some(min) = spec.min {
            if number < min {
                errors.push(format!("Field {name} must be >= {min}, got {number}"));
            }
        }
        if let Some(max) = spec.max {
            if number > max {
                errors.push(format!("Field {name} must be <= {max}, got {number}"));
            }
        }
    }
}

/// Numeric value of a field: a JSON number, or a string that converts cleanly
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|number| number.is_finite())
        }
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_progress_update_passes() {
        let report = validate(
            &json!({
                "event_type": "PROGRESS_UPDATE",
                "timestamp": "2025-06-01T10:00:00Z",
                "data": { "progress": 42.5 }
            }),
            None,
        );
        assert!(report.is_valid, "errors: {:?}", report.errors);
        assert_eq!(report.event_type.as_deref(), Some("PROGRESS_UPDATE"));
    }

    #[test]
    fn unknown_event_type_is_an_explicit_error() {
        let report = validate(&json!({ "event_type": "MYSTERY", "timestamp": "t" }), None);
        assert!(!report.is_valid);
        assert_eq!(report.errors, vec!["Unknown event type: MYSTERY".to_string()]);
    }

    #[test]
    fn hint_overrides_payload_event_type() {
        let report = validate(&json!({ "event_type": "MYSTERY" }), Some("PROGRESS_UPDATE"));
        assert_eq!(report.event_type.as_deref(), Some("PROGRESS_UPDATE"));
    }

    #[test]
    fn missing_required_data_field_is_reported() {
        let report = validate(
            &json!({
                "event_type": "PRE_CHECK_COMPLETE",
                "timestamp": "t",
                "data": {}
            }),
            None,
        );
        assert!(!report.is_valid);
        assert!(report
            .errors
            .iter()
            .any(|error| error.contains("validation_passed")));
    }

    #[test]
    fn progress_out_of_range_is_reported() {
        let report = validate(
            &json!({
                "event_type": "PROGRESS_UPDATE",
                "timestamp": "t",
                "data": { "progress": 120 }
            }),
            None,
        );
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|error| error.contains("<= 100")));
    }

    #[test]
    fn numeric_strings_are_accepted_only_when_convertible() {
        let ok = validate(
            &json!({
                "event_type": "PROGRESS_UPDATE",
                "timestamp": "t",
                "data": { "progress": "55.5" }
            }),
            None,
        );
        assert!(ok.is_valid, "errors: {:?}", ok.errors);

        let bad = validate(
            &json!({
                "event_type": "PROGRESS_UPDATE",
                "timestamp": "t",
                "data": { "progress": "55 percent" }
            }),
            None,
        );
        assert!(!bad.is_valid);
    }

    #[test]
    fn enum_membership_is_checked() {
        let report = validate(
            &json!({
                "event_type": "PRE_CHECK_RESULT",
                "timestamp": "t",
                "data": { "check_name": "storage", "passed": true, "severity": "fatal" }
            }),
            None,
        );
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|error| error.contains("severity")));
    }

    #[test]
    fn wrong_field_type_is_reported() {
        let report = validate(
            &json!({
                "event_type": "PRE_CHECK_COMPLETE",
                "timestamp": "t",
                "data": { "validation_passed": "yes" }
            }),
            None,
        );
        assert!(!report.is_valid);
        assert!(report
            .errors
            .iter()
            .any(|error| error.contains("must be a boolean")));
    }

    #[test]
    fn validation_does_not_mutate_the_payload() {
        let payload = json!({
            "event_type": "PROGRESS_UPDATE",
            "timestamp": "t",
            "data": { "progress": "55.5" }
        });
        let before = payload.clone();
        let _ = validate(&payload, None);
        assert_eq!(payload, before);
        // Convertibility check only: the stored value stays a string
        assert!(payload["data"]["progress"].is_string());
    }

    #[test]
    fn log_message_level_must_be_a_known_level() {
        let report = validate(
            &json!({ "event_type": "LOG_MESSAGE", "message": "hi", "level": "VERBOSE" }),
            None,
        );
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|error| error.contains("level")));

        let ok = validate(
            &json!({ "event_type": "LOG_MESSAGE", "message": "hi", "level": "WARNING" }),
            None,
        );
        assert!(ok.is_valid, "errors: {:?}", ok.errors);
    }

    #[test]
    fn every_recognized_type_has_a_schema() {
        for event_type in upline_contracts::RECOGNIZED_EVENT_TYPES {
            assert!(
                registry().contains_key(event_type),
                "missing schema for {event_type}"
            );
        }
    }
}

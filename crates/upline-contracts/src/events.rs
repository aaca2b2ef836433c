// Recognized event-type registry
//
// The set of event_type keys is itself part of the contract the pipeline,
// the schema validator, and the display collaborator rely on. Adding a
// type means adding a schema entry in upline-pipeline, and, if it should
// always be visible, adding it to ALWAYS_VISIBLE here.

// Progress and transfer events
pub const EVENT_PROGRESS_UPDATE: &str = "PROGRESS_UPDATE";
pub const EVENT_UPLOAD_START: &str = "UPLOAD_START";
pub const EVENT_UPLOAD_COMPLETE: &str = "UPLOAD_COMPLETE";

// Pre-check lifecycle
pub const EVENT_PRE_CHECK_COMPLETE: &str = "PRE_CHECK_COMPLETE";
pub const EVENT_PRE_CHECK_RESULT: &str = "PRE_CHECK_RESULT";

// Operation lifecycle
pub const EVENT_OPERATION_START: &str = "OPERATION_START";
pub const EVENT_OPERATION_COMPLETE: &str = "OPERATION_COMPLETE";
pub const EVENT_STEP_START: &str = "STEP_START";
pub const EVENT_STEP_COMPLETE: &str = "STEP_COMPLETE";
pub const EVENT_STEP_PROGRESS: &str = "STEP_PROGRESS";

// Device / upgrade progress feeds
pub const EVENT_DEVICE_PROGRESS: &str = "DEVICE_PROGRESS";
pub const EVENT_UPGRADE_PROGRESS: &str = "UPGRADE_PROGRESS";

// Wrapped free-text log lines
pub const EVENT_LOG_MESSAGE: &str = "LOG_MESSAGE";

// Template deployment
pub const EVENT_TEMPLATE_DEPLOY_START: &str = "TEMPLATE_DEPLOY_START";
pub const EVENT_TEMPLATE_DEPLOY_PROGRESS: &str = "TEMPLATE_DEPLOY_PROGRESS";
pub const EVENT_TEMPLATE_DEPLOY_COMPLETE: &str = "TEMPLATE_DEPLOY_COMPLETE";
pub const EVENT_TEMPLATE_VALIDATION_RESULT: &str = "TEMPLATE_VALIDATION_RESULT";
pub const EVENT_TEMPLATE_DIFF_GENERATED: &str = "TEMPLATE_DIFF_GENERATED";

// Synthesized by the pipeline itself
pub const EVENT_VALIDATION_RESULT: &str = "VALIDATION_RESULT";
pub const EVENT_PARSE_ERROR: &str = "PARSE_ERROR";
pub const EVENT_UNKNOWN: &str = "UNKNOWN";

/// Every event type the schema validator carries a contract for
pub const RECOGNIZED_EVENT_TYPES: &[&str] = &[
    EVENT_PROGRESS_UPDATE,
    EVENT_UPLOAD_START,
    EVENT_UPLOAD_COMPLETE,
    EVENT_PRE_CHECK_COMPLETE,
    EVENT_PRE_CHECK_RESULT,
    EVENT_OPERATION_START,
    EVENT_OPERATION_COMPLETE,
    EVENT_STEP_START,
    EVENT_STEP_COMPLETE,
    EVENT_STEP_PROGRESS,
    EVENT_DEVICE_PROGRESS,
    EVENT_UPGRADE_PROGRESS,
    EVENT_LOG_MESSAGE,
    EVENT_TEMPLATE_DEPLOY_START,
    EVENT_TEMPLATE_DEPLOY_PROGRESS,
    EVENT_TEMPLATE_DEPLOY_COMPLETE,
    EVENT_TEMPLATE_VALIDATION_RESULT,
    EVENT_TEMPLATE_DIFF_GENERATED,
];

/// Structural events that are exempt from noise filtering by policy
pub const ALWAYS_VISIBLE: &[&str] = &[
    EVENT_STEP_START,
    EVENT_STEP_COMPLETE,
    EVENT_OPERATION_START,
    EVENT_OPERATION_COMPLETE,
    EVENT_PRE_CHECK_COMPLETE,
    EVENT_VALIDATION_RESULT,
    EVENT_UPLOAD_START,
    EVENT_UPLOAD_COMPLETE,
];

/// True when `event_type` is exempt from noise filtering
///
/// Membership in ALWAYS_VISIBLE, plus any ERROR- or SUCCESS-named type.
pub fn is_always_visible(event_type: &str) -> bool {
    ALWAYS_VISIBLE.contains(&event_type)
        || event_type.contains("ERROR")
        || event_type.contains("SUCCESS")
}

/// True when the validator has a contract for `event_type`
pub fn is_recognized(event_type: &str) -> bool {
    RECOGNIZED_EVENT_TYPES.contains(&event_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_and_success_named_types_are_always_visible() {
        assert!(is_always_visible("PARSE_ERROR"));
        assert!(is_always_visible("DEPLOY_SUCCESS"));
        assert!(is_always_visible(EVENT_PRE_CHECK_COMPLETE));
        assert!(!is_always_visible(EVENT_LOG_MESSAGE));
        assert!(!is_always_visible(EVENT_DEVICE_PROGRESS));
    }

    #[test]
    fn registry_membership() {
        assert!(is_recognized(EVENT_PROGRESS_UPDATE));
        assert!(is_recognized(EVENT_TEMPLATE_DIFF_GENERATED));
        assert!(!is_recognized("SOMETHING_ELSE"));
        // Synthesized types are not transport contracts
        assert!(!is_recognized(EVENT_PARSE_ERROR));
    }
}

// Workflow state model
//
// One WorkflowState exists per operator session. It is mutated exclusively
// through the controller's named actions in upline-workflow and exposed to
// the display collaborator as a read-only snapshot. Everything derives
// PartialEq so reset() can be verified deep-equal against Default.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::CanonicalLogRecord;

/// The five operator-facing workflow stages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStep {
    Configure,
    PreCheck,
    Review,
    Upgrade,
    Results,
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStep::Configure => write!(f, "CONFIGURE"),
            WorkflowStep::PreCheck => write!(f, "PRE_CHECK"),
            WorkflowStep::Review => write!(f, "REVIEW"),
            WorkflowStep::Upgrade => write!(f, "UPGRADE"),
            WorkflowStep::Results => write!(f, "RESULTS"),
        }
    }
}

/// Final outcome recorded when the workflow reaches Results
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalStatus {
    Success,
    Failed,
}

/// Operator-entered device target, credentials, and check selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_filename: Option<String>,
    #[serde(default)]
    pub selected_pre_checks: Vec<String>,
}

impl DeviceConfig {
    /// True when host, credentials, and at least one check are all present
    pub fn is_ready_for_pre_check(&self) -> bool {
        !self.host.trim().is_empty()
            && !self.username.trim().is_empty()
            && !self.password.is_empty()
            && !self.selected_pre_checks.is_empty()
    }
}

/// Pre-check phase sub-state
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreCheckPhase {
    pub is_running: bool,
    pub is_complete: bool,
    /// Percent complete, always within [0, 100]
    pub progress: f32,
    pub logs: Vec<CanonicalLogRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
    #[serde(default)]
    pub results: Vec<Value>,
}

/// Upgrade phase sub-state
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradePhase {
    pub is_running: bool,
    pub is_complete: bool,
    /// Percent complete, always within [0, 100]
    pub progress: f32,
    pub logs: Vec<CanonicalLogRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// Review phase sub-state
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPhase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_check_data: Option<Value>,
    /// True iff the last summary carried `can_proceed: true` exactly
    pub can_proceed: bool,
}

/// Results phase sub-state
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultsPhase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_check_results: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_results: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_status: Option<FinalStatus>,
}

/// Complete per-session workflow state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub current_step: WorkflowStep,
    pub is_processing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_channel: Option<String>,
    pub device_config: DeviceConfig,
    pub pre_check: PreCheckPhase,
    pub upgrade: UpgradePhase,
    pub review: ReviewPhase,
    pub results: ResultsPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            current_step: WorkflowStep::Configure,
            is_processing: false,
            job_id: None,
            ws_channel: None,
            device_config: DeviceConfig::default(),
            pre_check: PreCheckPhase::default(),
            upgrade: UpgradePhase::default(),
            review: ReviewPhase::default(),
            results: ResultsPhase::default(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_starts_at_configure() {
        let state = WorkflowState::default();
        assert_eq!(state.current_step, WorkflowStep::Configure);
        assert!(!state.is_processing);
        assert!(state.pre_check.logs.is_empty());
        assert_eq!(state.pre_check.progress, 0.0);
        assert!(!state.review.can_proceed);
    }

    #[test]
    fn device_config_readiness_requires_a_selected_check() {
        let mut config = DeviceConfig {
            host: "edge-router-1".into(),
            username: "operator".into(),
            password: "secret".into(),
            ..DeviceConfig::default()
        };
        assert!(!config.is_ready_for_pre_check());

        config.selected_pre_checks.push("storage".into());
        assert!(config.is_ready_for_pre_check());
    }

    #[test]
    fn workflow_step_serializes_screaming_snake() {
        let json = serde_json::to_string(&WorkflowStep::PreCheck).unwrap();
        assert_eq!(json, "\"PRE_CHECK\"");
    }
}

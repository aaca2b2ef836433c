// Workflow controller
//
// Owns the per-session WorkflowState and mutates it exclusively through
// named actions. Key design decisions:
// - Every transition guard is re-derived from state at call time; there is
//   no cached "allowed steps" set to drift out of sync.
// - Rejected transitions return a typed WorkflowError, never a silent no-op.
// - Approval to upgrade requires `can_proceed` to be exactly boolean true
//   in the pre-check summary. Absent, null, or truthy-looking values do
//   not approve.

use serde_json::Value;
use tracing::{debug, info};

use upline_contracts::{
    events as event_types, CanonicalLogRecord, DeviceConfig, FinalStatus, LogKind, WorkflowState,
    WorkflowStep,
};
use upline_pipeline::Normalized;

use crate::error::{Result, WorkflowError};

/// Guarded state machine over the five workflow steps
#[derive(Debug, Clone, Default)]
pub struct WorkflowController {
    state: WorkflowState,
}

impl WorkflowController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only snapshot of the current state
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Whether `step` can be entered given the current state
    ///
    /// Derived, never stored. Configure is always open; PreCheck closes
    /// only while a run is in flight; Review and Upgrade require both a
    /// completed pre-check and the review approval; Results opens once
    /// either phase has finished.
    pub fn step_accessible(&self, step: WorkflowStep) -> bool {
        match step {
            WorkflowStep::Configure => true,
            WorkflowStep::PreCheck => !self.state.pre_check.is_running,
            WorkflowStep::Review => {
                self.state.pre_check.is_complete && self.state.review.can_proceed
            }
            WorkflowStep::Upgrade => {
                self.state.pre_check.is_complete
                    && self.state.review.can_proceed
                    && !self.state.upgrade.is_running
            }
            WorkflowStep::Results => {
                self.state.pre_check.is_complete || self.state.upgrade.is_complete
            }
        }
    }

    /// Navigate to `step`, rejecting steps whose guard does not hold
    pub fn set_current_step(&mut self, step: WorkflowStep) -> Result<()> {
        if !self.step_accessible(step) {
            return Err(WorkflowError::StepNotAccessible {
                current: self.state.current_step,
                requested: step,
            });
        }
        debug!(from = %self.state.current_step, to = %step, "workflow step change");
        self.state.current_step = step;
        Ok(())
    }

    /// Replace the device configuration (allowed at any step)
    pub fn update_device_config(&mut self, config: DeviceConfig) {
        self.state.device_config = config;
    }

    /// Enter PRE_CHECK and arm a fresh pre-check phase
    ///
    /// Re-running discards the previous phase entirely, including logs.
    pub fn start_pre_check(&mut self) -> Result<()> {
        if !self.state.device_config.is_ready_for_pre_check() {
            return Err(WorkflowError::ConfigurationIncomplete(
                "host, credentials, and at least one selected check are required".to_string(),
            ));
        }
        if self.state.pre_check.is_running {
            return Err(WorkflowError::PhaseAlreadyRunning(WorkflowStep::PreCheck));
        }
        info!(host = %self.state.device_config.host, "starting pre-check");
        self.state.pre_check = Default::default();
        self.state.pre_check.is_running = true;
        self.state.review = Default::default();
        self.state.job_id = None;
        self.state.ws_channel = None;
        self.state.is_processing = true;
        self.state.error = None;
        self.state.current_step = WorkflowStep::PreCheck;
        Ok(())
    }

    /// Enter REVIEW with the pre-check outcome under review
    ///
    /// Approval is re-derived from the supplied data on every call: the
    /// last submission wins, and only `summary.can_proceed` being exactly
    /// boolean true approves. Anything else, including truthy non-boolean
    /// values, refuses.
    pub fn move_to_review(&mut self, pre_check_data: Value) -> Result<()> {
        if !self.state.pre_check.is_complete {
            return Err(WorkflowError::PreCheckIncomplete);
        }
        let can_proceed = pre_check_data
            .get("summary")
            .and_then(|summary| summary.get("can_proceed"))
            .and_then(Value::as_bool)
            == Some(true);
        self.state.review.pre_check_data = Some(pre_check_data);
        self.state.review.can_proceed = can_proceed;
        self.state.is_processing = false;
        self.state.current_step = WorkflowStep::Review;
        Ok(())
    }

    /// Enter UPGRADE, gated on the review's explicit approval
    pub fn start_upgrade(&mut self) -> Result<()> {
        if !self.state.pre_check.is_complete {
            return Err(WorkflowError::PreCheckIncomplete);
        }
        if !self.state.review.can_proceed {
            return Err(WorkflowError::ProceedNotApproved);
        }
        if self.state.upgrade.is_running {
            return Err(WorkflowError::PhaseAlreadyRunning(WorkflowStep::Upgrade));
        }
        info!(host = %self.state.device_config.host, "starting upgrade");
        self.state.upgrade = Default::default();
        self.state.upgrade.is_running = true;
        self.state.job_id = None;
        self.state.ws_channel = None;
        self.state.is_processing = true;
        self.state.error = None;
        self.state.current_step = WorkflowStep::Upgrade;
        Ok(())
    }

    /// Enter RESULTS and record the final outcome from `result`
    ///
    /// Reachable once either phase reports completion. Only a boolean
    /// `success: true` in `result` records a SUCCESS verdict.
    pub fn move_to_results(&mut self, result: Value) -> Result<()> {
        if !self.step_accessible(WorkflowStep::Results) {
            return Err(WorkflowError::NoCompletedPhase);
        }
        self.state.results.pre_check_results = self.state.pre_check.summary.clone();
        self.state.results.upgrade_results = self.state.upgrade.result.clone();
        let succeeded = result.get("success").and_then(Value::as_bool) == Some(true);
        self.state.results.final_status = Some(if succeeded {
            FinalStatus::Success
        } else {
            FinalStatus::Failed
        });
        self.state.is_processing = false;
        self.state.current_step = WorkflowStep::Results;
        Ok(())
    }

    /// Return to a pristine state, deep-equal to Default
    pub fn reset(&mut self) {
        debug!("workflow reset");
        self.state = WorkflowState::default();
    }

    /// Record the backend job id; the first value wins
    pub fn set_job(&mut self, job_id: impl Into<String>) {
        let job_id = job_id.into();
        match &self.state.job_id {
            Some(existing) if *existing != job_id => {
                debug!(%existing, ignored = %job_id, "job id already set, keeping first");
            }
            Some(_) => {}
            None => {
                let phase_job = Some(job_id.clone());
                match self.state.current_step {
                    WorkflowStep::Upgrade => self.state.upgrade.job_id = phase_job,
                    _ => self.state.pre_check.job_id = phase_job,
                }
                self.state.job_id = Some(job_id);
            }
        }
    }

    /// Record the event channel name; the first value wins
    pub fn set_ws_channel(&mut self, channel: impl Into<String>) {
        let channel = channel.into();
        match &self.state.ws_channel {
            Some(existing) if *existing != channel => {
                debug!(%existing, ignored = %channel, "channel already set, keeping first");
            }
            Some(_) => {}
            None => self.state.ws_channel = Some(channel),
        }
    }

    /// Record a session-level error message
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.state.error = Some(message.into());
        self.state.is_processing = false;
    }

    /// Fold one normalized event into the active phase
    ///
    /// Records always land in the active phase's log, including technical
    /// ones; the display collaborator decides what to show. Completion
    /// events flip the phase flags that the transition guards read.
    pub fn apply(&mut self, normalized: &Normalized) {
        self.apply_record(&normalized.record);
        if let Some(parse_error) = &normalized.parse_error {
            self.active_logs().push(parse_error.clone());
        }
    }

    fn apply_record(&mut self, record: &CanonicalLogRecord) {
        let payload = record.original_event.clone();
        if let Some(job_id) = payload.get("job_id").and_then(Value::as_str) {
            self.set_job(job_id);
        }

        let event_type = payload
            .get("event_type")
            .and_then(Value::as_str)
            .unwrap_or(event_types::EVENT_UNKNOWN);

        match event_type {
            event_types::EVENT_PROGRESS_UPDATE | event_types::EVENT_UPGRADE_PROGRESS => {
                if let Some(progress) = payload
                    .get("data")
                    .and_then(|data| data.get("progress"))
                    .and_then(Value::as_f64)
                {
                    self.set_active_progress(progress as f32);
                }
            }
            event_types::EVENT_DEVICE_PROGRESS => {
                // Step counters arrive without a percentage; derive one
                let data = payload.get("data");
                let step = data.and_then(|d| d.get("step")).and_then(Value::as_f64);
                let total = data.and_then(|d| d.get("total_steps")).and_then(Value::as_f64);
                if let (Some(step), Some(total)) = (step, total) {
                    if total > 0.0 {
                        self.set_active_progress((step / total * 100.0) as f32);
                    }
                }
            }
            event_types::EVENT_PRE_CHECK_RESULT => {
                let entry = payload.get("data").cloned().unwrap_or(payload.clone());
                self.state.pre_check.results.push(entry);
            }
            event_types::EVENT_PRE_CHECK_COMPLETE => self.complete_pre_check(&payload),
            event_types::EVENT_OPERATION_COMPLETE
                if self.state.current_step == WorkflowStep::Upgrade =>
            {
                self.complete_upgrade(&payload)
            }
            _ => {}
        }

        if record.kind == LogKind::Error && event_type.contains("ERROR") {
            self.state.error = Some(record.message.clone());
        }

        self.active_logs().push(record.clone());
    }

    /// Mark the pre-check finished and derive the review approval
    fn complete_pre_check(&mut self, payload: &Value) {
        let data = payload.get("data").cloned().unwrap_or(Value::Null);

        self.state.pre_check.is_running = false;
        self.state.pre_check.is_complete = true;
        self.state.pre_check.progress = 100.0;
        self.state.pre_check.summary = Some(data.clone());

        // Strict boolean equality: only JSON `true` approves
        let can_proceed = data.get("can_proceed").and_then(Value::as_bool) == Some(true)
            || (data.get("can_proceed").is_none()
                && data.get("validation_passed").and_then(Value::as_bool) == Some(true));

        self.state.review.pre_check_data = Some(data);
        self.state.review.can_proceed = can_proceed;
        self.state.is_processing = false;
        info!(can_proceed, "pre-check complete");
    }

    /// Mark the upgrade finished and record the final outcome
    fn complete_upgrade(&mut self, payload: &Value) {
        let data = payload.get("data").cloned().unwrap_or(Value::Null);
        let succeeded = data.get("success").and_then(Value::as_bool) != Some(false)
            && data.get("status").and_then(Value::as_str) != Some("FAILED");

        self.state.upgrade.is_running = false;
        self.state.upgrade.is_complete = true;
        self.state.upgrade.progress = 100.0;
        self.state.upgrade.result = Some(data);
        self.state.results.final_status = Some(if succeeded {
            FinalStatus::Success
        } else {
            FinalStatus::Failed
        });
        self.state.is_processing = false;
        info!(succeeded, "upgrade complete");
    }

    fn set_active_progress(&mut self, progress: f32) {
        let clamped = progress.clamp(0.0, 100.0);
        match self.state.current_step {
            WorkflowStep::Upgrade => self.state.upgrade.progress = clamped,
            _ => self.state.pre_check.progress = clamped,
        }
    }

    fn active_logs(&mut self) -> &mut Vec<CanonicalLogRecord> {
        match self.state.current_step {
            WorkflowStep::Upgrade => &mut self.state.upgrade.logs,
            _ => &mut self.state.pre_check.logs,
        }
    }
}

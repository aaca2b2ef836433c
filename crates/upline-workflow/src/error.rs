// Error types for workflow transitions

use thiserror::Error;
use upline_contracts::WorkflowStep;

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors raised by guarded workflow transitions
///
/// Every rejected transition is a typed error, never a silent no-op, so
/// callers can surface the reason to the operator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// Device configuration is missing required fields
    #[error("Device configuration incomplete: {0}")]
    ConfigurationIncomplete(String),

    /// Requested step is not reachable from the current position
    #[error("Step {requested} is not accessible from {current}")]
    StepNotAccessible {
        current: WorkflowStep,
        requested: WorkflowStep,
    },

    /// Review requires a completed pre-check
    #[error("Pre-check has not completed")]
    PreCheckIncomplete,

    /// Upgrade requires an explicit approval from the review step
    #[error("Upgrade not approved: pre-check review did not allow proceeding")]
    ProceedNotApproved,

    /// A phase cannot be re-armed while a run is in flight
    #[error("{0} is already running")]
    PhaseAlreadyRunning(WorkflowStep),

    /// Results require at least one finished phase
    #[error("No completed phase to report")]
    NoCompletedPhase,
}

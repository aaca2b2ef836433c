// Workflow orchestration for device upgrade sessions
//
// Key design decisions:
// - WorkflowController is a plain state machine; all async lives in the
//   Session pump so the guards stay trivially testable.
// - The display collaborator is a trait object the session owns an Arc to,
//   mirroring how storage collaborators are injected elsewhere.
// - Transition failures are typed errors; callers translate them for the
//   operator.

pub mod controller;
pub mod error;
pub mod session;

pub use controller::WorkflowController;
pub use error::{Result, WorkflowError};
pub use session::{DisplaySink, MemorySink, Session};

// Public contracts for Upline
// This crate defines the canonical log record, the workflow state model,
// the recognized event-type registry, and the transport input boundary.
//
// These are the only structures the display collaborator consumes; field
// names and serialized shapes are a compatibility contract.

pub mod events;
pub mod frame;
pub mod record;
pub mod workflow;

pub use events::*;
pub use frame::*;
pub use record::*;
pub use workflow::*;

// Event Normalization Pipeline
//
// This crate turns the raw, inconsistently-shaped frames emitted by
// device-automation jobs into canonical, display-ready log records.
//
// Key design decisions:
// - PayloadExtractor never fails; every input degrades to a usable payload
// - Schema validation is diagnostic only and never blocks normalization
// - Noise/signal heuristics are ordered rule tables, not branching code
// - Formatting is a tagged registry over EventTag, exhaustively matched
// - One frame yields one primary record, plus at most one PARSE_ERROR
//   diagnostic record when embedded JSON was found but unparseable

pub mod config;
pub mod extract;
pub mod noise;
pub mod normalize;
pub mod schema;

// Re-exports for convenience
pub use config::PipelineConfig;
pub use extract::{EmbeddedJsonError, Extraction, PayloadExtractor};
pub use noise::{is_noise, is_user_facing};
pub use normalize::{EventTag, LogNormalizer, Normalized};
pub use schema::{validate, EventSchema, FieldSpec, FieldType, ValidationReport};

// Pipeline configuration
//
// PipelineConfig tunes the extraction and diagnostic limits. It can be
// created directly with Default or adjusted through the fluent setters.

use serde::{Deserialize, Serialize};

/// Configuration for the normalization pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Maximum envelope unwrap depth (wrapper → data → embedded text → JSON)
    #[serde(default = "default_max_unwrap_depth")]
    pub max_unwrap_depth: usize,

    /// Maximum length of the raw excerpt carried by PARSE_ERROR records
    #[serde(default = "default_max_excerpt_len")]
    pub max_excerpt_len: usize,
}

fn default_max_unwrap_depth() -> usize {
    4
}

fn default_max_excerpt_len() -> usize {
    120
}

impl PipelineConfig {
    /// Create a configuration with the default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum unwrap depth
    pub fn with_max_unwrap_depth(mut self, depth: usize) -> Self {
        self.max_unwrap_depth = depth;
        self
    }

    /// Set the maximum PARSE_ERROR excerpt length
    pub fn with_max_excerpt_len(mut self, len: usize) -> Self {
        self.max_excerpt_len = len;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_unwrap_depth: default_max_unwrap_depth(),
            max_excerpt_len: default_max_excerpt_len(),
        }
    }
}

//! Runtime configuration.
//!
//! The limits here guard against feedback loops: a wire that writes to a
//! signal it reads, or a task that keeps writing back into the store it
//! observes. Both are bugs in user code, and the runtime turns them into
//! errors instead of unbounded recursion.

use serde::{Deserialize, Serialize};

/// Limits applied by a [`Runtime`](crate::reactive::Runtime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum number of batches that may be nested inside each other
    /// through writes issued from wire bodies or tasks.
    pub max_batch_depth: usize,

    /// Maximum number of consecutive re-runs of a wire that invalidates
    /// itself during its own run.
    pub max_rerun_rounds: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_batch_depth: 64,
            max_rerun_rounds: 64,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

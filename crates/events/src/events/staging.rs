use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Staging domain events - the copy of a package into the staging slot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StagingEvent {
    /// Staging copy started
    Started {
        package: String,
        /// Source length when the origin can report one; `None` for
        /// stream-shaped sources (progress is indeterminate).
        total_bytes: Option<u64>,
        staging_path: PathBuf,
    },

    /// Staging copy progress update
    Progress {
        bytes_copied: u64,
        total_bytes: Option<u64>,
    },

    /// Staging copy completed; the staged file is now readable downstream
    Completed {
        staging_path: PathBuf,
        bytes_copied: u64,
    },

    /// Staging copy failed; no staged file was left behind
    Failed { failure: FailureContext },
}

use serde::{Deserialize, Serialize};

use otactl_types::{InstallStrategy, SessionState, Uuid};

use super::FailureContext;

/// Install session domain events - the controller state machine as seen by
/// observers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InstallEvent {
    /// A new install session was started for the given reference
    SessionStarted { session_id: Uuid, reference: String },

    /// The session moved to a new lifecycle state
    StateChanged {
        session_id: Uuid,
        state: SessionState,
    },

    /// The classifier derived the install strategy for the staged package
    Classified {
        session_id: Uuid,
        strategy: InstallStrategy,
    },

    /// The session is waiting for explicit user confirmation
    ConfirmationRequired {
        session_id: Uuid,
        strategy: InstallStrategy,
        package: String,
        total_bytes: u64,
    },

    /// The user answered the confirmation prompt
    ConfirmationReceived { session_id: Uuid, confirmed: bool },

    /// Install progress update; `None` while indeterminate
    Progress {
        session_id: Uuid,
        percent: Option<u8>,
    },

    /// The session completed successfully. For the legacy strategy this
    /// means the handoff to the privileged phase succeeded.
    Completed {
        session_id: Uuid,
        strategy: InstallStrategy,
    },

    /// The session failed
    Failed {
        session_id: Uuid,
        failure: FailureContext,
    },

    /// The user declined before commit
    Cancelled { session_id: Uuid },
}

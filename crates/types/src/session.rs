//! Install session lifecycle states and observer snapshots

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::package::InstallStrategy;

/// Why a session ended in [`SessionState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The source could not be opened for reading at resolution time.
    NotFound,
    /// Copying into the staging location failed.
    IoFailure,
    /// The staged file is not a recognizable update archive.
    InvalidPackage,
    /// The battery precondition was not met.
    BatteryLow,
    /// The delegated installer reported a failure.
    InstallError,
}

/// Lifecycle state of an install session.
///
/// Sessions move strictly forward through the non-terminal states; every
/// failure is terminal and a fresh `start()` re-runs the whole sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No session has run on this controller yet.
    Idle,
    /// Resolving the user-provided reference into a readable source.
    Locating,
    /// Copying source bytes into the staging location.
    Staging,
    /// Deriving the install strategy from the staged bytes.
    Classifying,
    /// Evaluating environment preconditions.
    AwaitingPrecondition,
    /// Waiting for the user's explicit confirm/decline.
    AwaitingConfirmation,
    /// The selected installer capability is running.
    Installing,
    /// Terminal: installation (or legacy handoff) succeeded.
    Completed,
    /// Terminal: the session failed with the given kind.
    Failed { kind: FailureKind },
    /// Terminal: the user declined before commit.
    Cancelled,
}

impl SessionState {
    /// Whether this state ends the session.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. } | Self::Cancelled)
    }

    /// Whether a session is currently in flight.
    #[must_use]
    pub fn is_active(self) -> bool {
        !self.is_terminal() && self != Self::Idle
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Locating => "locating",
            Self::Staging => "staging",
            Self::Classifying => "classifying",
            Self::AwaitingPrecondition => "awaiting precondition",
            Self::AwaitingConfirmation => "awaiting confirmation",
            Self::Installing => "installing",
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// Point-in-time view of a session, published over the watch channel.
///
/// Written only by the session's background task; observed from any
/// context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Identifier of the session this snapshot belongs to; `None` before
    /// the first session starts.
    pub session_id: Option<Uuid>,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Progress in 0..=100; `None` while indeterminate or inapplicable.
    pub progress: Option<u8>,
    /// Strategy derived by the classifier, once known.
    pub strategy: Option<InstallStrategy>,
    /// User-facing explanation for a terminal failure.
    pub failure: Option<String>,
}

impl SessionSnapshot {
    /// The snapshot a controller publishes before any session has run.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            session_id: None,
            state: SessionState::Idle,
            progress: None,
            strategy: None,
            failure: None,
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

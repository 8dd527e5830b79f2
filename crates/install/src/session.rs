//! Session state publication
//!
//! The session's background task is the single writer: every transition
//! flows through `SessionCtx`, which updates the watch snapshot and mirrors
//! the change onto the event channel. Observers only ever read.

use std::sync::Arc;

use otactl_errors::Error;
use otactl_events::{AppEvent, EventEmitter, EventSender, FailureContext, InstallEvent};
use otactl_types::{FailureKind, InstallStrategy, SessionSnapshot, SessionState, Uuid};
use tokio::sync::watch;

pub(crate) struct SessionCtx {
    id: Uuid,
    snapshot: SessionSnapshot,
    watch_tx: Arc<watch::Sender<SessionSnapshot>>,
    events: EventSender,
}

impl SessionCtx {
    pub(crate) fn new(
        id: Uuid,
        watch_tx: Arc<watch::Sender<SessionSnapshot>>,
        events: EventSender,
    ) -> Self {
        Self {
            id,
            snapshot: SessionSnapshot {
                session_id: Some(id),
                state: SessionState::Idle,
                progress: None,
                strategy: None,
                failure: None,
            },
            watch_tx,
            events,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn transition(&mut self, state: SessionState) {
        self.snapshot.state = state;
        self.publish();
        self.events.emit(AppEvent::Install(InstallEvent::StateChanged {
            session_id: self.id,
            state,
        }));
    }

    pub(crate) fn set_strategy(&mut self, strategy: InstallStrategy) {
        self.snapshot.strategy = Some(strategy);
        self.publish();
        self.events.emit(AppEvent::Install(InstallEvent::Classified {
            session_id: self.id,
            strategy,
        }));
    }

    pub(crate) fn set_progress(&mut self, percent: Option<u8>) {
        self.snapshot.progress = percent;
        self.publish();
        self.events.emit(AppEvent::Install(InstallEvent::Progress {
            session_id: self.id,
            percent,
        }));
    }

    pub(crate) fn complete(&mut self, strategy: InstallStrategy) {
        self.snapshot.progress = Some(100);
        self.transition(SessionState::Completed);
        self.events.emit(AppEvent::Install(InstallEvent::Completed {
            session_id: self.id,
            strategy,
        }));
    }

    pub(crate) fn fail(&mut self, kind: FailureKind, error: &Error) {
        let failure = FailureContext::from_error(error);
        tracing::error!(session = %self.id, ?kind, error = %error, "install session failed");
        self.snapshot.failure = Some(failure.message.clone());
        self.transition(SessionState::Failed { kind });
        self.events.emit(AppEvent::Install(InstallEvent::Failed {
            session_id: self.id,
            failure,
        }));
    }

    pub(crate) fn cancel(&mut self) {
        self.transition(SessionState::Cancelled);
        self.events.emit(AppEvent::Install(InstallEvent::Cancelled {
            session_id: self.id,
        }));
    }

    /// Handle given to the seamless installer for the duration of the
    /// `Installing` phase.
    pub(crate) fn reporter(&self) -> ProgressReporter {
        ProgressReporter {
            session_id: self.id,
            watch_tx: Arc::clone(&self.watch_tx),
            events: self.events.clone(),
        }
    }

    fn publish(&self) {
        let _ = self.watch_tx.send(self.snapshot.clone());
    }
}

/// Progress handle passed to the seamless installer capability.
///
/// Only valid for the duration of one `Installing` phase; the installer
/// runs inside the session task, so updates stay on the single writer.
pub struct ProgressReporter {
    session_id: Uuid,
    watch_tx: Arc<watch::Sender<SessionSnapshot>>,
    events: EventSender,
}

impl ProgressReporter {
    /// Identifier of the session being installed.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// The event channel, for installer-specific events.
    #[must_use]
    pub fn events(&self) -> &EventSender {
        &self.events
    }

    /// Report install progress in 0..=100.
    pub fn progress(&self, percent: u8) {
        self.update(Some(percent.min(100)));
    }

    /// Report that progress is currently indeterminate.
    pub fn indeterminate(&self) {
        self.update(None);
    }

    fn update(&self, percent: Option<u8>) {
        self.watch_tx.send_modify(|snapshot| {
            snapshot.progress = percent;
        });
        self.events.emit(AppEvent::Install(InstallEvent::Progress {
            session_id: self.session_id,
            percent,
        }));
    }
}

//! Install orchestration
//!
//! `UpdateController` owns the session state machine and sequences
//! locator → stager → classifier → precondition gate → installer strategy,
//! multiplexing state and progress to observers. One controller drives at
//! most one active session at a time; concurrent starts are rejected, since
//! two sessions writing the same staging path would corrupt each other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use otactl_config::Config;
use otactl_errors::{Error, UpdateError};
use otactl_events::{AppEvent, EventEmitter, EventSender, InstallEvent};
use otactl_platform::BatteryProvider;
use otactl_types::{
    FailureKind, InstallStrategy, PreconditionResult, SessionSnapshot, SessionState, Uuid,
};
use tokio::sync::{oneshot, watch};
use tokio::task;

use crate::classifier::{self, ArchiveInspector, ZipPayloadInspector};
use crate::locator::{self, UpdateSource};
use crate::precondition;
use crate::session::SessionCtx;
use crate::stager;
use crate::strategy::{LegacyInstaller, SeamlessInstaller};

/// Drives at most one install session at a time.
///
/// Construct with the installer capabilities and a battery provider; the
/// session runs on a background task and publishes snapshots over a watch
/// channel written only by that task.
pub struct UpdateController<B, S, L, A = ZipPayloadInspector> {
    inner: Arc<Inner<B, S, L, A>>,
}

struct Inner<B, S, L, A> {
    config: Config,
    battery: B,
    seamless: S,
    legacy: L,
    inspector: Arc<A>,
    events: EventSender,
    watch_tx: Arc<watch::Sender<SessionSnapshot>>,
    /// Pending confirmation for the active session, once it has reached
    /// `AwaitingConfirmation`.
    confirm_tx: Mutex<Option<oneshot::Sender<bool>>>,
    /// Claimed by `start()`, released when the session task exits.
    active: Arc<AtomicBool>,
}

impl<B, S, L, A> std::fmt::Debug for UpdateController<B, S, L, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateController")
            .field("config", &self.inner.config)
            .field("active", &self.inner.active.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<B, S, L> UpdateController<B, S, L>
where
    B: BatteryProvider + 'static,
    S: SeamlessInstaller,
    L: LegacyInstaller,
{
    /// Create a controller with the default ZIP payload inspector.
    #[must_use]
    pub fn new(config: Config, battery: B, seamless: S, legacy: L, events: EventSender) -> Self {
        Self::with_inspector(config, battery, seamless, legacy, ZipPayloadInspector, events)
    }
}

impl<B, S, L, A> UpdateController<B, S, L, A>
where
    B: BatteryProvider + 'static,
    S: SeamlessInstaller,
    L: LegacyInstaller,
    A: ArchiveInspector,
{
    /// Create a controller with a custom archive-inspection capability.
    #[must_use]
    pub fn with_inspector(
        config: Config,
        battery: B,
        seamless: S,
        legacy: L,
        inspector: A,
        events: EventSender,
    ) -> Self {
        let (watch_tx, _) = watch::channel(SessionSnapshot::idle());
        Self {
            inner: Arc::new(Inner {
                config,
                battery,
                seamless,
                legacy,
                inspector: Arc::new(inspector),
                events,
                watch_tx: Arc::new(watch_tx),
                confirm_tx: Mutex::new(None),
                active: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// Begin a new install session for `source`.
    ///
    /// The session runs on a background task; observe it through
    /// [`subscribe`](Self::subscribe) and the event channel. Must be called
    /// from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `UpdateError::SessionActive` while a previous session has
    /// not reached a terminal state.
    pub fn start(&self, source: UpdateSource) -> Result<Uuid, Error> {
        if self
            .inner
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(UpdateError::SessionActive.into());
        }

        let id = Uuid::new_v4();
        let inner = Arc::clone(&self.inner);
        task::spawn(run_session(inner, id, source));
        Ok(id)
    }

    /// Confirm the pending install; the session proceeds to `Installing`.
    ///
    /// # Errors
    ///
    /// Returns `UpdateError::NotAwaitingConfirmation` when no session is
    /// waiting at the confirmation step.
    pub fn confirm(&self) -> Result<(), Error> {
        self.answer(true)
    }

    /// Decline the pending install; the session ends in `Cancelled` with no
    /// installer invocation.
    ///
    /// # Errors
    ///
    /// Returns `UpdateError::NotAwaitingConfirmation` when no session is
    /// waiting at the confirmation step.
    pub fn decline(&self) -> Result<(), Error> {
        self.answer(false)
    }

    fn answer(&self, confirmed: bool) -> Result<(), Error> {
        let sender = {
            let mut slot = self
                .inner
                .confirm_tx
                .lock()
                .map_err(|_| Error::internal("confirmation slot poisoned"))?;
            slot.take()
        };
        match sender {
            Some(tx) => {
                let _ = tx.send(confirmed);
                Ok(())
            }
            None => Err(UpdateError::NotAwaitingConfirmation.into()),
        }
    }

    /// Subscribe to session snapshots. Values are written only by the
    /// session's background task.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.watch_tx.subscribe()
    }

    /// The latest session snapshot.
    #[must_use]
    pub fn current(&self) -> SessionSnapshot {
        self.inner.watch_tx.borrow().clone()
    }

    /// Wait until the session started on this controller reaches a terminal
    /// state, returning its final snapshot.
    pub async fn wait_terminal(&self) -> SessionSnapshot {
        let mut rx = self.subscribe();
        let snapshot = match rx.wait_for(|s| s.state.is_terminal()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.current(),
        };
        snapshot
    }
}

/// Releases the controller's single-session slot when the task exits,
/// whatever path it took.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn run_session<B, S, L, A>(inner: Arc<Inner<B, S, L, A>>, id: Uuid, source: UpdateSource)
where
    B: BatteryProvider + 'static,
    S: SeamlessInstaller,
    L: LegacyInstaller,
    A: ArchiveInspector,
{
    let _active = ActiveGuard(Arc::clone(&inner.active));
    let mut ctx = SessionCtx::new(id, Arc::clone(&inner.watch_tx), inner.events.clone());

    inner
        .events
        .emit(AppEvent::Install(InstallEvent::SessionStarted {
            session_id: id,
            reference: source.describe(),
        }));

    ctx.transition(SessionState::Locating);
    let reference = match locator::resolve(source).await {
        Ok(reference) => reference,
        Err(e) => return ctx.fail(FailureKind::NotFound, &e),
    };
    let package_name = reference.name().to_string();

    ctx.transition(SessionState::Staging);
    if reference.total_bytes().is_none() {
        // Stream-shaped source: the copy runs with indeterminate progress.
        ctx.set_progress(None);
    }
    let staged = match stager::stage(reference, &inner.config.paths.staging_dir, &inner.events).await
    {
        Ok(staged) => staged,
        Err(e) => return ctx.fail(FailureKind::IoFailure, &e),
    };

    ctx.transition(SessionState::Classifying);
    let strategy = classifier::classify(Arc::clone(&inner.inspector), &staged).await;
    if !strategy.is_installable() {
        let error: Error = UpdateError::InvalidPackage {
            path: staged.path().display().to_string(),
            message: "not a recognizable update archive".to_string(),
        }
        .into();
        return ctx.fail(FailureKind::InvalidPackage, &error);
    }
    ctx.set_strategy(strategy);

    // Re-evaluated here rather than at session creation: staging can take
    // arbitrary wall-clock time during which battery state changes.
    ctx.transition(SessionState::AwaitingPrecondition);
    let status = match inner.battery.status() {
        Ok(status) => status,
        Err(e) => return ctx.fail(FailureKind::IoFailure, &e),
    };
    let policy = inner.config.battery.policy();
    if let PreconditionResult::BatteryLow { status, policy } =
        precondition::check_battery(status, policy)
    {
        let error: Error = UpdateError::BatteryLow {
            percent: status.percent,
            charging: status.charging,
            discharging_min: policy.discharging_min,
            charging_min: policy.charging_min,
        }
        .into();
        return ctx.fail(FailureKind::BatteryLow, &error);
    }

    // Installation is partially or fully irreversible; both strategies
    // require an explicit confirmation before any system state changes.
    // The confirmation slot is armed before the state is published, so any
    // observer that sees `AwaitingConfirmation` can answer.
    let (confirm_tx, confirm_rx) = oneshot::channel();
    {
        let Ok(mut slot) = inner.confirm_tx.lock() else {
            return ctx.fail(
                FailureKind::InstallError,
                &Error::internal("confirmation slot poisoned"),
            );
        };
        *slot = Some(confirm_tx);
    }
    ctx.transition(SessionState::AwaitingConfirmation);
    inner
        .events
        .emit(AppEvent::Install(InstallEvent::ConfirmationRequired {
            session_id: id,
            strategy,
            package: package_name,
            total_bytes: staged.len(),
        }));

    // A dropped sender (controller released) counts as a decline.
    let confirmed = confirm_rx.await.unwrap_or(false);
    if let Ok(mut slot) = inner.confirm_tx.lock() {
        slot.take();
    }
    inner
        .events
        .emit(AppEvent::Install(InstallEvent::ConfirmationReceived {
            session_id: id,
            confirmed,
        }));

    if !confirmed {
        return ctx.cancel();
    }

    // No cancellation from here on: partial flashing cannot be safely
    // aborted, so the install runs to Completed or Failed.
    ctx.transition(SessionState::Installing);
    let outcome = match strategy {
        InstallStrategy::Seamless => {
            let monitor = ctx.reporter();
            inner.seamless.install(&staged, &monitor).await
        }
        InstallStrategy::Legacy => {
            // Handoff runs off the async context; the staged file stays at
            // its well-known path for the privileged phase.
            let legacy_inner = Arc::clone(&inner);
            let package = staged.clone();
            match task::spawn_blocking(move || legacy_inner.legacy.install_package(&package)).await
            {
                Ok(result) => result,
                Err(e) => Err(Error::internal(format!("legacy installer task failed: {e}"))),
            }
        }
        InstallStrategy::Invalid => Err(Error::internal("invalid strategy reached installing")),
    };

    match outcome {
        Ok(()) => ctx.complete(strategy),
        Err(e) => ctx.fail(FailureKind::InstallError, &e),
    }
}

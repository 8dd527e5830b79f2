//! End-to-end install session tests with mock installer capabilities.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use otactl_config::{BatteryConfig, Config, PathConfig};
use otactl_errors::{Error, UpdateError};
use otactl_events::{AppEvent, EventReceiver, InstallEvent};
use otactl_install::{
    classify, LegacyInstaller, ProgressReporter, SeamlessInstaller, UpdateController,
    UpdateSource, ZipPayloadInspector, STAGED_PACKAGE_NAME,
};
use otactl_platform::BatteryProvider;
use otactl_types::{
    BatteryStatus, FailureKind, InstallStrategy, SessionState, StagedPackage,
};
use tempfile::TempDir;
use tokio::io::{AsyncRead, ReadBuf};

#[derive(Clone)]
struct MutableBattery(Arc<Mutex<BatteryStatus>>);

impl MutableBattery {
    fn set(&self, status: BatteryStatus) {
        *self.0.lock().expect("battery lock") = status;
    }
}

impl BatteryProvider for MutableBattery {
    fn status(&self) -> Result<BatteryStatus, Error> {
        Ok(*self.0.lock().expect("battery lock"))
    }
}

struct RecordingSeamless {
    calls: Arc<AtomicUsize>,
    outcome: Option<UpdateError>,
}

impl SeamlessInstaller for RecordingSeamless {
    async fn install(
        &self,
        _package: &StagedPackage,
        monitor: &ProgressReporter,
    ) -> Result<(), Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for percent in [25, 50, 100] {
            monitor.progress(percent);
        }
        match &self.outcome {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }
}

struct RecordingLegacy {
    calls: Arc<AtomicUsize>,
}

impl LegacyInstaller for RecordingLegacy {
    fn install_package(&self, package: &StagedPackage) -> Result<(), Error> {
        // The handoff file must exist at its well-known path when the
        // privileged phase is told about it.
        assert!(package.path().exists());
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Reader that yields some bytes, then fails.
struct FailingReader {
    remaining: Vec<u8>,
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if self.remaining.is_empty() {
            return Poll::Ready(Err(std::io::Error::other("simulated source failure")));
        }
        let n = self.remaining.len().min(buf.remaining());
        let chunk: Vec<u8> = self.remaining.drain(..n).collect();
        buf.put_slice(&chunk);
        Poll::Ready(Ok(()))
    }
}

struct Fixture {
    controller: UpdateController<MutableBattery, RecordingSeamless, RecordingLegacy>,
    events: EventReceiver,
    staging_dir: PathBuf,
    seamless_calls: Arc<AtomicUsize>,
    legacy_calls: Arc<AtomicUsize>,
    battery: MutableBattery,
    td: TempDir,
}

fn fixture_with_seamless_outcome(outcome: Option<UpdateError>) -> Fixture {
    let td = TempDir::new().expect("tempdir");
    let staging_dir = td.path().join("staging");

    let config = Config {
        battery: BatteryConfig {
            discharging_min: 20,
            charging_min: 15,
        },
        paths: PathConfig {
            staging_dir: staging_dir.clone(),
        },
    };

    let battery = MutableBattery(Arc::new(Mutex::new(BatteryStatus {
        percent: 80,
        charging: false,
    })));
    let seamless_calls = Arc::new(AtomicUsize::new(0));
    let legacy_calls = Arc::new(AtomicUsize::new(0));

    let (tx, rx) = otactl_events::channel();
    let controller = UpdateController::new(
        config,
        battery.clone(),
        RecordingSeamless {
            calls: Arc::clone(&seamless_calls),
            outcome,
        },
        RecordingLegacy {
            calls: Arc::clone(&legacy_calls),
        },
        tx,
    );

    Fixture {
        controller,
        events: rx,
        staging_dir,
        seamless_calls,
        legacy_calls,
        battery,
        td,
    }
}

fn fixture() -> Fixture {
    fixture_with_seamless_outcome(None)
}

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).expect("create zip");
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, contents) in entries {
        writer.start_file(*name, options).expect("start entry");
        writer.write_all(contents).expect("write entry");
    }
    writer.finish().expect("finish zip");
}

fn seamless_package(dir: &Path) -> PathBuf {
    let path = dir.join("ota-seamless.zip");
    write_zip(
        &path,
        &[
            ("payload.bin", b"payload bytes".as_slice()),
            ("payload_properties.txt", b"FILE_SIZE=13".as_slice()),
        ],
    );
    path
}

fn legacy_package(dir: &Path) -> PathBuf {
    let path = dir.join("ota-legacy.zip");
    write_zip(
        &path,
        &[
            ("META-INF/com/google/android/update-binary", b"#!".as_slice()),
            ("boot.img", b"kernel".as_slice()),
        ],
    );
    path
}

fn drain(events: &mut EventReceiver) -> Vec<AppEvent> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

fn state_sequence(events: &[AppEvent]) -> Vec<SessionState> {
    events
        .iter()
        .filter_map(|event| match event {
            AppEvent::Install(InstallEvent::StateChanged { state, .. }) => Some(*state),
            _ => None,
        })
        .collect()
}

async fn wait_for_confirmation(fixture: &Fixture) {
    let mut rx = fixture.controller.subscribe();
    rx.wait_for(|s| s.state == SessionState::AwaitingConfirmation)
        .await
        .expect("watch open");
}

#[tokio::test]
async fn seamless_package_completes_after_confirm() {
    let mut fx = fixture();
    let source = seamless_package(fx.td.path());

    fx.controller
        .start(UpdateSource::Path(source))
        .expect("start");
    wait_for_confirmation(&fx).await;

    let snapshot = fx.controller.current();
    assert_eq!(snapshot.strategy, Some(InstallStrategy::Seamless));

    fx.controller.confirm().expect("confirm");
    let terminal = fx.controller.wait_terminal().await;

    assert_eq!(terminal.state, SessionState::Completed);
    assert_eq!(terminal.progress, Some(100));
    assert_eq!(fx.seamless_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fx.legacy_calls.load(Ordering::SeqCst), 0);

    // Installing is only ever entered after the confirmation states.
    let states = state_sequence(&drain(&mut fx.events));
    let confirm_at = states
        .iter()
        .position(|s| *s == SessionState::AwaitingConfirmation)
        .expect("awaited confirmation");
    let installing_at = states
        .iter()
        .position(|s| *s == SessionState::Installing)
        .expect("reached installing");
    assert!(confirm_at < installing_at);
}

#[tokio::test]
async fn legacy_package_hands_off_and_keeps_staged_file() {
    let mut fx = fixture();
    let source = legacy_package(fx.td.path());

    fx.controller
        .start(UpdateSource::Path(source))
        .expect("start");
    wait_for_confirmation(&fx).await;
    assert_eq!(
        fx.controller.current().strategy,
        Some(InstallStrategy::Legacy)
    );

    fx.controller.confirm().expect("confirm");
    let terminal = fx.controller.wait_terminal().await;

    assert_eq!(terminal.state, SessionState::Completed);
    assert_eq!(fx.legacy_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fx.seamless_calls.load(Ordering::SeqCst), 0);
    // Completed means "handoff succeeded": the staged file persists for the
    // privileged phase that runs outside this process.
    assert!(fx.staging_dir.join(STAGED_PACKAGE_NAME).exists());

    let events = drain(&mut fx.events);
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::Install(InstallEvent::ConfirmationReceived {
            confirmed: true,
            ..
        })
    )));
}

#[tokio::test]
async fn decline_cancels_without_installer_invocation() {
    let mut fx = fixture();
    let source = seamless_package(fx.td.path());

    fx.controller
        .start(UpdateSource::Path(source))
        .expect("start");
    wait_for_confirmation(&fx).await;
    fx.controller.decline().expect("decline");

    let terminal = fx.controller.wait_terminal().await;
    assert_eq!(terminal.state, SessionState::Cancelled);
    assert_eq!(fx.seamless_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fx.legacy_calls.load(Ordering::SeqCst), 0);

    let states = state_sequence(&drain(&mut fx.events));
    assert!(!states.contains(&SessionState::Installing));
}

#[tokio::test]
async fn invalid_package_fails_before_confirmation() {
    let mut fx = fixture();
    let source = fx.td.path().join("not-an-update.zip");
    std::fs::write(&source, b"plain text, not an archive").expect("write");

    fx.controller
        .start(UpdateSource::Path(source))
        .expect("start");
    let terminal = fx.controller.wait_terminal().await;

    assert_eq!(
        terminal.state,
        SessionState::Failed {
            kind: FailureKind::InvalidPackage
        }
    );
    assert_eq!(fx.seamless_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fx.legacy_calls.load(Ordering::SeqCst), 0);

    let events = drain(&mut fx.events);
    let states = state_sequence(&events);
    assert!(!states.contains(&SessionState::Installing));
    assert!(!events.iter().any(|e| matches!(
        e,
        AppEvent::Install(InstallEvent::ConfirmationRequired { .. })
    )));
}

#[tokio::test]
async fn missing_source_fails_with_not_found() {
    let fx = fixture();

    fx.controller
        .start(UpdateSource::Uri("file:///nonexistent/update.zip".to_string()))
        .expect("start");
    let terminal = fx.controller.wait_terminal().await;

    assert_eq!(
        terminal.state,
        SessionState::Failed {
            kind: FailureKind::NotFound
        }
    );
}

#[tokio::test]
async fn battery_low_is_terminal_and_names_thresholds() {
    let mut fx = fixture();
    fx.battery.set(BatteryStatus {
        percent: 19,
        charging: false,
    });
    let source = seamless_package(fx.td.path());

    fx.controller
        .start(UpdateSource::Path(source))
        .expect("start");
    let terminal = fx.controller.wait_terminal().await;

    assert_eq!(
        terminal.state,
        SessionState::Failed {
            kind: FailureKind::BatteryLow
        }
    );
    let message = terminal.failure.expect("failure message");
    assert!(message.contains("19%"));
    assert!(message.contains("20%"));
    assert!(message.contains("15%"));

    let events = drain(&mut fx.events);
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::Install(InstallEvent::Failed { failure, .. })
            if failure.code.as_deref() == Some("update.battery_low")
    )));
}

#[tokio::test]
async fn charging_threshold_is_lower() {
    let fx = fixture();
    fx.battery.set(BatteryStatus {
        percent: 16,
        charging: true,
    });
    let source = seamless_package(fx.td.path());

    fx.controller
        .start(UpdateSource::Path(source))
        .expect("start");
    wait_for_confirmation(&fx).await;

    fx.controller.decline().expect("decline");
    fx.controller.wait_terminal().await;
}

#[tokio::test]
async fn gate_is_reevaluated_on_every_attempt() {
    let fx = fixture();
    fx.battery.set(BatteryStatus {
        percent: 10,
        charging: false,
    });
    let source = seamless_package(fx.td.path());

    fx.controller
        .start(UpdateSource::Path(source.clone()))
        .expect("start");
    let terminal = fx.controller.wait_terminal().await;
    assert_eq!(
        terminal.state,
        SessionState::Failed {
            kind: FailureKind::BatteryLow
        }
    );

    // The user charges the device and retries; the fresh session re-runs
    // every step including the gate.
    fx.battery.set(BatteryStatus {
        percent: 90,
        charging: true,
    });
    fx.controller
        .start(UpdateSource::Path(source))
        .expect("restart");
    wait_for_confirmation(&fx).await;
    fx.controller.confirm().expect("confirm");

    let terminal = fx.controller.wait_terminal().await;
    assert_eq!(terminal.state, SessionState::Completed);
}

#[tokio::test]
async fn concurrent_start_is_rejected() {
    let fx = fixture();
    let source = seamless_package(fx.td.path());

    fx.controller
        .start(UpdateSource::Path(source.clone()))
        .expect("start");

    let second = fx.controller.start(UpdateSource::Path(source));
    assert!(matches!(
        second,
        Err(Error::Update(UpdateError::SessionActive))
    ));

    wait_for_confirmation(&fx).await;
    fx.controller.decline().expect("decline");
    fx.controller.wait_terminal().await;

    // The slot is free again after the terminal state.
    let source = seamless_package(fx.td.path());
    fx.controller
        .start(UpdateSource::Path(source))
        .expect("start after terminal");
    wait_for_confirmation(&fx).await;
    fx.controller.decline().expect("decline");
    fx.controller.wait_terminal().await;
}

#[tokio::test]
async fn midcopy_failure_leaves_no_staged_file() {
    let fx = fixture();

    fx.controller
        .start(UpdateSource::Stream {
            name: "broken.zip".to_string(),
            reader: Box::new(FailingReader {
                remaining: vec![0u8; 64 * 1024],
            }),
        })
        .expect("start");
    let terminal = fx.controller.wait_terminal().await;

    assert_eq!(
        terminal.state,
        SessionState::Failed {
            kind: FailureKind::IoFailure
        }
    );

    let staged_path = fx.staging_dir.join(STAGED_PACKAGE_NAME);
    assert!(!staged_path.exists());

    // Nothing at the staging location may classify as installable.
    let strategy = classify(
        Arc::new(ZipPayloadInspector),
        &StagedPackage::new(staged_path, 0),
    )
    .await;
    assert_eq!(strategy, InstallStrategy::Invalid);
}

#[tokio::test]
async fn installer_failure_preserves_verification_kind() {
    let mut fx = fixture_with_seamless_outcome(Some(UpdateError::VerificationFailed {
        message: "payload hash mismatch".to_string(),
    }));
    let source = seamless_package(fx.td.path());

    fx.controller
        .start(UpdateSource::Path(source))
        .expect("start");
    wait_for_confirmation(&fx).await;
    fx.controller.confirm().expect("confirm");

    let terminal = fx.controller.wait_terminal().await;
    assert_eq!(
        terminal.state,
        SessionState::Failed {
            kind: FailureKind::InstallError
        }
    );

    let events = drain(&mut fx.events);
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::Install(InstallEvent::Failed { failure, .. })
            if failure.code.as_deref() == Some("update.verification_failed")
    )));
}

#[tokio::test]
async fn confirm_without_pending_session_is_rejected() {
    let fx = fixture();
    assert!(matches!(
        fx.controller.confirm(),
        Err(Error::Update(UpdateError::NotAwaitingConfirmation))
    ));
    assert!(matches!(
        fx.controller.decline(),
        Err(Error::Update(UpdateError::NotAwaitingConfirmation))
    ));
}

#[tokio::test]
async fn restaging_replaces_previous_package() {
    let fx = fixture();

    // First session stages the legacy package and is declined.
    let legacy = legacy_package(fx.td.path());
    fx.controller
        .start(UpdateSource::Path(legacy))
        .expect("start");
    wait_for_confirmation(&fx).await;
    fx.controller.decline().expect("decline");
    fx.controller.wait_terminal().await;

    // Second session stages the seamless package over it; classification is
    // re-derived from the new bytes.
    let seamless = seamless_package(fx.td.path());
    let expected_len = std::fs::metadata(&seamless).expect("metadata").len();
    fx.controller
        .start(UpdateSource::Path(seamless))
        .expect("start");
    wait_for_confirmation(&fx).await;

    let snapshot = fx.controller.current();
    assert_eq!(snapshot.strategy, Some(InstallStrategy::Seamless));

    let staged_len = std::fs::metadata(fx.staging_dir.join(STAGED_PACKAGE_NAME))
        .expect("staged metadata")
        .len();
    assert_eq!(staged_len, expected_len);

    fx.controller.decline().expect("decline");
    fx.controller.wait_terminal().await;
}

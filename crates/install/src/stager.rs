//! Package staging
//!
//! Copies the resolved source into the controller-owned staging slot. The
//! staging path is a single-slot resource: it is always fully replaced,
//! never appended to, and nothing downstream may read it until the copy has
//! completed.

use std::path::Path;

use otactl_errors::{Error, UpdateError};
use otactl_events::{AppEvent, EventEmitter, EventSender, FailureContext, StagingEvent};
use otactl_types::StagedPackage;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::locator::{PackageReference, SourceOrigin};

/// Canonical name of the staged package file. Fixed rather than derived
/// from user input, so downstream consumers (including the
/// recovery-mediated phase) have a stable location.
pub const STAGED_PACKAGE_NAME: &str = "update.zip";

/// Copy buffer size. Not a correctness parameter.
const COPY_BUF_SIZE: usize = 8 * 1024;

/// Bytes copied between progress events.
const PROGRESS_STRIDE: u64 = 1024 * 1024;

/// Copy the referenced package into `staging_dir`, fully replacing any
/// previously staged file.
///
/// A `StagedPackage` is produced only once the copy has completed and been
/// flushed to disk; on any mid-copy failure the partial destination file is
/// removed before the error is returned.
///
/// # Errors
///
/// Returns `UpdateError::StagingFailed` if the staging directory cannot be
/// prepared or any read/write fails mid-copy.
pub async fn stage(
    reference: PackageReference,
    staging_dir: &Path,
    events: &EventSender,
) -> Result<StagedPackage, Error> {
    fs::create_dir_all(staging_dir)
        .await
        .map_err(|e| staging_failed("create staging directory", &e))?;

    let dest = staging_dir.join(STAGED_PACKAGE_NAME);

    // Stale bytes from a previous session must never survive into this one.
    match fs::remove_file(&dest).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(staging_failed("remove stale staged file", &e)),
    }

    let total = reference.total_bytes();
    let (name, origin) = reference.into_parts();

    events.emit(AppEvent::Staging(StagingEvent::Started {
        package: name.clone(),
        total_bytes: total,
        staging_path: dest.clone(),
    }));

    match copy_into(origin, &dest, total, events).await {
        Ok(bytes_copied) => {
            events.emit(AppEvent::Staging(StagingEvent::Completed {
                staging_path: dest.clone(),
                bytes_copied,
            }));
            tracing::debug!(package = %name, bytes = bytes_copied, "package staged");
            Ok(StagedPackage::new(dest, bytes_copied))
        }
        Err(e) => {
            // Never expose a partial copy.
            let _ = fs::remove_file(&dest).await;
            events.emit(AppEvent::Staging(StagingEvent::Failed {
                failure: FailureContext::from_error(&e),
            }));
            Err(e)
        }
    }
}

async fn copy_into(
    origin: SourceOrigin,
    dest: &Path,
    total: Option<u64>,
    events: &EventSender,
) -> Result<u64, Error> {
    let mut reader: Box<dyn AsyncRead + Send + Unpin> = match origin {
        SourceOrigin::Stream(reader) => reader,
        SourceOrigin::File { file, .. } => Box::new(file),
    };

    let mut out = fs::File::create(dest)
        .await
        .map_err(|e| staging_failed("create staged file", &e))?;

    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut copied: u64 = 0;
    let mut last_reported: u64 = 0;

    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| staging_failed("read source", &e))?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])
            .await
            .map_err(|e| staging_failed("write staged file", &e))?;
        copied += n as u64;

        if copied - last_reported >= PROGRESS_STRIDE {
            last_reported = copied;
            events.emit(AppEvent::Staging(StagingEvent::Progress {
                bytes_copied: copied,
                total_bytes: total,
            }));
        }
    }

    out.flush()
        .await
        .map_err(|e| staging_failed("flush staged file", &e))?;
    out.sync_all()
        .await
        .map_err(|e| staging_failed("sync staged file", &e))?;

    Ok(copied)
}

fn staging_failed(operation: &str, e: &std::io::Error) -> Error {
    UpdateError::StagingFailed {
        message: format!("{operation}: {e}"),
    }
    .into()
}

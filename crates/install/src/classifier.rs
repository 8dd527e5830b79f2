//! Package classification
//!
//! Decides between the two mutually exclusive installation strategies: a
//! package carrying the dual-partition payload marker installs seamlessly
//! against the inactive slot, anything else that is still a valid archive
//! goes through the recovery-mediated legacy flow.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use otactl_errors::{Error, UpdateError};
use otactl_types::{InstallStrategy, StagedPackage};
use tokio::task;

/// Archive entry that marks a dual-partition payload.
const PAYLOAD_ENTRY: &str = "payload.bin";
/// Companion properties entry; both must be present.
const PAYLOAD_PROPERTIES_ENTRY: &str = "payload_properties.txt";

/// Archive-inspection capability consumed by the classifier.
pub trait ArchiveInspector: Send + Sync + 'static {
    /// Whether the archive at `path` carries a dual-partition payload.
    ///
    /// # Errors
    ///
    /// Returns `UpdateError::NotAnArchive` if the file is missing,
    /// unreadable, or not a valid archive.
    fn is_dual_partition(&self, path: &Path) -> Result<bool, Error>;
}

/// Default inspector: opens the package as a ZIP archive and looks for the
/// payload marker entries. Presence of the marker is sufficient; no deeper
/// payload validation is attempted here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPayloadInspector;

impl ArchiveInspector for ZipPayloadInspector {
    fn is_dual_partition(&self, path: &Path) -> Result<bool, Error> {
        let not_an_archive = |message: String| UpdateError::NotAnArchive {
            path: path.display().to_string(),
            message,
        };

        let file = File::open(path).map_err(|e| not_an_archive(e.to_string()))?;
        let archive =
            zip::ZipArchive::new(file).map_err(|e| not_an_archive(e.to_string()))?;

        let has_payload = archive.file_names().any(|n| n == PAYLOAD_ENTRY);
        let has_properties = archive.file_names().any(|n| n == PAYLOAD_PROPERTIES_ENTRY);
        Ok(has_payload && has_properties)
    }
}

/// Derive the install strategy for a staged package.
///
/// Non-retryable and never cached: re-derived for every staged package. A
/// missing, unreadable, or non-archive file classifies as `Invalid` rather
/// than erroring.
pub async fn classify<A: ArchiveInspector>(
    inspector: Arc<A>,
    staged: &StagedPackage,
) -> InstallStrategy {
    let path = staged.path().to_path_buf();
    let result = task::spawn_blocking(move || inspector.is_dual_partition(&path)).await;

    match result {
        Ok(Ok(true)) => InstallStrategy::Seamless,
        Ok(Ok(false)) => InstallStrategy::Legacy,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "package did not classify as an update archive");
            InstallStrategy::Invalid
        }
        Err(e) => {
            tracing::error!(error = %e, "classifier task failed");
            InstallStrategy::Invalid
        }
    }
}

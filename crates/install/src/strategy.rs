//! Installer strategy capabilities
//!
//! The two installers are opaque capabilities injected into the controller
//! at construction; the flashing/patching they perform is outside this
//! crate. There is no cancellation once either has started: the contract is
//! "runs to completed or failed".

use std::future::Future;

use otactl_errors::Error;
use otactl_types::StagedPackage;

use crate::session::ProgressReporter;

/// Dual-partition installer: writes the update to the inactive slot while
/// the running system keeps operating.
pub trait SeamlessInstaller: Send + Sync + 'static {
    /// Install the staged package, reporting progress through the monitor
    /// while running.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying installer reports a failure;
    /// `UpdateError::VerificationFailed` is preserved as-is when the
    /// installer distinguishes it.
    fn install(
        &self,
        package: &StagedPackage,
        monitor: &ProgressReporter,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Recovery-mediated installer: hands the staged package off to a
/// privileged phase that runs outside this process's lifetime. Success
/// means the handoff was accepted, not that flashing finished; the staged
/// file is left in place at its well-known path for that phase to read.
pub trait LegacyInstaller: Send + Sync + 'static {
    /// Hand the staged package off for the recovery-mediated flow.
    ///
    /// Synchronous from the controller's perspective; the controller always
    /// invokes it off the foreground context.
    ///
    /// # Errors
    ///
    /// Returns an error when the handoff is rejected.
    fn install_package(&self, package: &StagedPackage) -> Result<(), Error>;
}

#![warn(clippy::pedantic)]
#![deny(clippy::all)]

//! Update package installation for otactl
//!
//! This crate is the spine of the update manager: it resolves a
//! user-selected package reference, stages it into the controller-owned
//! slot, classifies it as a seamless (dual-partition) or legacy
//! (recovery-mediated) package, gates on battery preconditions, and drives
//! the selected installer capability through a bounded session state
//! machine. State and progress reach observers over single-writer channels.

mod classifier;
mod controller;
mod locator;
mod precondition;
mod session;
mod stager;
mod strategy;

pub use classifier::{classify, ArchiveInspector, ZipPayloadInspector};
pub use controller::UpdateController;
pub use locator::{resolve, PackageReference, UpdateSource};
pub use precondition::check_battery;
pub use session::ProgressReporter;
pub use stager::{stage, STAGED_PACKAGE_NAME};
pub use strategy::{LegacyInstaller, SeamlessInstaller};

// Re-export EventSender for use by installer capabilities
pub use otactl_events::EventSender;

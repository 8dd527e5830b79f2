//! Staged package model and install strategies

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Installation strategy derived from a staged package.
///
/// Derived by the classifier from the staged bytes and never stored
/// independently of the package it was derived from; a new staging
/// operation always re-derives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStrategy {
    /// Dual-partition package: installs against the inactive slot while the
    /// running system keeps operating, activated on next reboot.
    Seamless,
    /// Single-partition package: requires the recovery-mediated flow outside
    /// this process's lifetime.
    Legacy,
    /// Not a recognizable update package.
    Invalid,
}

impl InstallStrategy {
    /// Whether this strategy can actually be installed.
    #[must_use]
    pub fn is_installable(self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

impl std::fmt::Display for InstallStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seamless => write!(f, "seamless"),
            Self::Legacy => write!(f, "legacy"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

/// The controller-owned copy of an update package on durable local storage.
///
/// At most one staged package is active per controller instance; the stager
/// fully replaces any previous file at the staging path before producing a
/// new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedPackage {
    path: PathBuf,
    len: u64,
}

impl StagedPackage {
    /// Create a staged package record for a completed copy.
    #[must_use]
    pub fn new(path: PathBuf, len: u64) -> Self {
        Self { path, len }
    }

    /// Absolute path of the staged file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte length of the staged file.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the staged file contains no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

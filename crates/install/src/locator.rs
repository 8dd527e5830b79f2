//! Package source resolution
//!
//! Unifies the input shapes the update picker can hand us behind one
//! `PackageReference` contract: an already-open content stream, a
//! scheme-prefixed path reference, or a bare filesystem path.

use std::fmt;
use std::path::{Path, PathBuf};

use otactl_errors::{Error, UpdateError};
use tokio::fs::File;
use tokio::io::AsyncRead;

/// Scheme prefix stripped from URI-shaped references.
const FILE_SCHEME: &str = "file://";

/// A user-provided reference to an update package, before resolution.
pub enum UpdateSource {
    /// Content-provider style handle: the stream is already open and there
    /// is no stable filesystem path behind it.
    Stream {
        name: String,
        reader: Box<dyn AsyncRead + Send + Unpin>,
    },
    /// Path-like reference that may carry a scheme prefix.
    Uri(String),
    /// Bare filesystem path.
    Path(PathBuf),
}

impl UpdateSource {
    /// Display name for logging and session events.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Stream { name, .. } => name.clone(),
            Self::Uri(uri) => uri.clone(),
            Self::Path(path) => path.display().to_string(),
        }
    }
}

impl fmt::Debug for UpdateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream { name, .. } => f.debug_struct("Stream").field("name", name).finish(),
            Self::Uri(uri) => f.debug_tuple("Uri").field(uri).finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

/// A resolved, readable package source plus its display name.
///
/// Immutable once created; consumed by the stager.
pub struct PackageReference {
    name: String,
    origin: SourceOrigin,
}

pub(crate) enum SourceOrigin {
    Stream(Box<dyn AsyncRead + Send + Unpin>),
    File { file: File, len: u64 },
}

impl PackageReference {
    /// Declared display name of the package.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source length in bytes, when the origin can report one.
    #[must_use]
    pub fn total_bytes(&self) -> Option<u64> {
        match &self.origin {
            SourceOrigin::Stream(_) => None,
            SourceOrigin::File { len, .. } => Some(*len),
        }
    }

    pub(crate) fn into_parts(self) -> (String, SourceOrigin) {
        (self.name, self.origin)
    }
}

impl fmt::Debug for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageReference")
            .field("name", &self.name)
            .field("total_bytes", &self.total_bytes())
            .finish()
    }
}

/// Resolve a raw reference into an open, readable package source.
///
/// Path-shaped references are opened here so an unreadable source fails
/// fast with `NotFound` instead of surfacing later inside the stager. No
/// file contents are read.
///
/// # Errors
///
/// Returns `UpdateError::NotFound` when a path-shaped reference cannot be
/// opened for reading.
pub async fn resolve(source: UpdateSource) -> Result<PackageReference, Error> {
    match source {
        UpdateSource::Stream { name, reader } => Ok(PackageReference {
            name,
            origin: SourceOrigin::Stream(reader),
        }),
        UpdateSource::Uri(uri) => {
            let path = uri
                .strip_prefix(FILE_SCHEME)
                .map_or_else(|| PathBuf::from(&uri), PathBuf::from);
            open_path(&path).await
        }
        UpdateSource::Path(path) => open_path(&path).await,
    }
}

async fn open_path(path: &Path) -> Result<PackageReference, Error> {
    let not_found = || UpdateError::NotFound {
        reference: path.display().to_string(),
    };

    let file = File::open(path).await.map_err(|_| not_found())?;
    let len = file.metadata().await.map_err(|_| not_found())?.len();

    let name = path.file_name().map_or_else(
        || path.display().to_string(),
        |n| n.to_string_lossy().into_owned(),
    );

    Ok(PackageReference {
        name,
        origin: SourceOrigin::File { file, len },
    })
}

//! Error types returned by every facade operation.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A Result type alias over [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced to callers.
///
/// The underlying OS or parse error is always carried as the source; nothing
/// is re-worded beyond naming the path involved.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("no such file or directory: {}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    #[error("archive entry escapes the output directory: {0}")]
    UnsafeEntryName(String),

    #[error("invalid JSON in {}: {source}", path.display())]
    MalformedJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Classify an io error raised while operating on `path`.
    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Error::NotFound { path, source },
            _ => Error::Io { path, source },
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedArchive(msg.into())
    }

    /// Whether this error reports a missing path.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

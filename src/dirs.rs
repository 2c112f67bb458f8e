//! Parent directory materialization.
//!
//! Directories are created one component at a time, root first, so each
//! creation only ever depends on its parent. A directory that already exists,
//! or that appears between the existence check and the create call, is not an
//! error. Nothing is rolled back when a later component fails.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::trace;

use crate::error::{Error, Result};

/// Make sure every ancestor directory of `file_path` exists.
///
/// The target file itself is never created or touched.
///
/// # Errors
///
/// Returns [`Error::DirectoryCreation`] naming the first directory that could
/// not be created for a reason other than already existing.
pub async fn ensure_parent_dirs(file_path: impl AsRef<Path>) -> Result<()> {
    match file_path.as_ref().parent() {
        Some(parent) => ensure_dir_chain(parent).await,
        None => Ok(()),
    }
}

/// Make sure `dir` and all of its ancestors exist.
pub async fn ensure_dir_chain(dir: impl AsRef<Path>) -> Result<()> {
    let mut current = PathBuf::new();
    for component in dir.as_ref().components() {
        current.push(component);
        if fs::metadata(&current).await.is_ok() {
            continue;
        }
        match fs::create_dir(&current).await {
            Ok(()) => trace!(path = %current.display(), "created directory"),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(source) => {
                return Err(Error::DirectoryCreation {
                    path: current,
                    source,
                });
            }
        }
    }
    Ok(())
}

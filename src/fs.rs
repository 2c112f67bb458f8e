//! The file access facade.
//!
//! [`FileSystem`] is a stateless handle whose methods delegate to the free
//! functions of this module. Every operation takes explicit paths and never
//! depends on the process working directory beyond how relative paths are
//! resolved by the OS.

use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};
use crate::io::{LocalFileReader, ReadAt};
use crate::options::{ExtractOptions, ReadOptions};
use crate::zip::{ExtractSummary, ZipExtractor};

/// Stateless file access facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystem;

impl FileSystem {
    pub fn new() -> Self {
        Self
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool> {
        exists(path)
    }

    pub async fn extract_zip(
        &self,
        archive: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<ExtractSummary> {
        extract_zip(archive, output_dir).await
    }

    pub async fn extract_zip_with(
        &self,
        archive: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
        options: &ExtractOptions,
    ) -> Result<ExtractSummary> {
        extract_zip_with(archive, output_dir, options).await
    }

    pub fn read_dir(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        read_dir(path)
    }

    pub fn read_json<T: DeserializeOwned>(
        &self,
        path: impl AsRef<Path>,
        options: &ReadOptions,
    ) -> Result<T> {
        read_json(path, options)
    }

    pub fn delete(&self, path: impl AsRef<Path>) -> Result<()> {
        delete(path)
    }
}

/// Whether anything exists at `path`.
///
/// A missing path is `Ok(false)`; other OS errors (e.g. permission denied on
/// a parent) are returned.
pub fn exists(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    path.try_exists().map_err(|e| Error::io(path, e))
}

/// Extract every file entry of the ZIP archive at `archive` below `output_dir`
/// with default [`ExtractOptions`].
///
/// Directory placeholder entries are skipped: directories only appear when a
/// file beneath them is written.
pub async fn extract_zip(
    archive: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
) -> Result<ExtractSummary> {
    extract_zip_with(archive, output_dir, &ExtractOptions::default()).await
}

/// Extract the ZIP archive at `archive` below `output_dir`.
///
/// Entries are written one at a time in archive order. The first failure
/// aborts the whole extraction; files written before it are left in place.
pub async fn extract_zip_with(
    archive: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<ExtractSummary> {
    let archive = archive.as_ref();
    debug!(archive = %archive.display(), "opening archive");
    let reader = LocalFileReader::open(archive).await?;
    extract_from_reader(Arc::new(reader), output_dir, options).await
}

/// Extract a ZIP archive from any random-access source.
pub async fn extract_from_reader<R: ReadAt>(
    reader: Arc<R>,
    output_dir: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<ExtractSummary> {
    let mut extractor = ZipExtractor::open(reader, options.clone()).await?;
    extractor.extract_all(output_dir.as_ref()).await
}

/// Names of the immediate children of `path`, in OS enumeration order.
///
/// Names that are not valid UTF-8 are converted lossily.
pub fn read_dir(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    std::fs::read_dir(path)
        .map_err(|e| Error::io(path, e))?
        .map(|entry| {
            entry
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .map_err(|e| Error::io(path, e))
        })
        .collect()
}

/// Read the file at `path` and parse it as JSON into `T`.
///
/// A leading UTF-8 byte order mark is ignored. This is more lenient than
/// `serde_json` on its own, which rejects a leading U+FEFF as invalid JSON;
/// files written by editors that prepend a BOM still parse.
pub fn read_json<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    options: &ReadOptions,
) -> Result<T> {
    let path = path.as_ref();
    let mut file = options
        .flag
        .open_options()
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| Error::io(path, e))?;

    let text = options
        .decode(bytes)
        .map_err(|e| Error::io(path, std::io::Error::new(ErrorKind::InvalidData, e)))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    serde_json::from_str(text).map_err(|source| Error::MalformedJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove the file or directory tree at `path`.
///
/// A missing path is success. Symbolic links are removed, never followed.
/// No check is made that `path` lies below any particular root.
pub fn delete(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io(path, e)),
    };

    let removed = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match removed {
        Ok(()) => {
            debug!(path = %path.display(), "deleted");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn exists_reports_absence_as_false() {
        let temp = TempDir::new().unwrap();
        assert!(exists(temp.path()).unwrap());
        assert!(!exists(temp.path().join("missing")).unwrap());
    }

    #[test]
    fn read_dir_of_missing_path_is_not_found() {
        let temp = TempDir::new().unwrap();
        assert!(read_dir(temp.path().join("missing")).unwrap_err().is_not_found());
    }

    #[test]
    fn read_dir_of_a_file_fails() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(read_dir(&file), Err(Error::Io { .. })));
    }

    #[test]
    fn read_json_skips_byte_order_mark() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("bom.json");
        std::fs::write(&file, b"\xef\xbb\xbf{\"a\": 1}").unwrap();

        let value: serde_json::Value = read_json(&file, &ReadOptions::default()).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn delete_removes_single_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("one.txt");
        std::fs::write(&file, b"x").unwrap();

        delete(&file).unwrap();
        assert!(!file.exists());
    }

    #[cfg(unix)]
    #[test]
    fn delete_does_not_follow_symlinks() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep.txt"), b"x").unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        delete(&link).unwrap();

        assert!(std::fs::symlink_metadata(&link).is_err());
        assert!(target.join("keep.txt").exists());
    }
}

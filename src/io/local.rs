use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::ReadAt;
use crate::error::{Error, Result};

/// Local file reader with random access support
pub struct LocalFileReader {
    file: std::fs::File,
    path: PathBuf,
    size: u64,
}

impl LocalFileReader {
    /// Open `path` for positional reads.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)
            .await
            .map_err(|e| Error::io(&path, e))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| Error::io(&path, e))?
            .len();
        Ok(Self {
            file: file.into_std().await,
            path,
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        #[cfg(unix)]
        let read = {
            use std::os::unix::fs::FileExt;
            self.file.read_at(buf, offset)
        };

        #[cfg(windows)]
        let read = {
            use std::os::windows::fs::FileExt;
            self.file.seek_read(buf, offset)
        };

        #[cfg(not(any(unix, windows)))]
        let read = {
            use std::io::{Read, Seek, SeekFrom};
            let mut file = &self.file;
            file.seek(SeekFrom::Start(offset)).and_then(|_| file.read(buf))
        };

        read.map_err(|e| Error::io(&self.path, e))
    }

    fn size(&self) -> u64 {
        self.size
    }
}

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use flate2::{Decompress, FlushDecompress, Status};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use crate::dirs::{ensure_dir_chain, ensure_parent_dirs};
use crate::error::{Error, Result};
use crate::io::ReadAt;
use crate::options::ExtractOptions;

use super::parser::ZipArchive;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Outcome of a completed extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// File entries written to disk
    pub files: usize,
    /// Entries that produced no file (directory placeholders, existing files kept)
    pub skipped: usize,
}

/// Pull-based reader over one entry's decompressed bytes.
///
/// Each call to [`next_chunk`](EntryReader::next_chunk) reads at most one
/// buffer of archive data; `None` marks the end of the entry.
pub struct EntryReader<'a, R: ReadAt> {
    reader: &'a R,
    /// Next compressed byte to read
    offset: u64,
    /// Compressed bytes not yet read
    remaining: u64,
    input: Vec<u8>,
    input_pos: usize,
    output: Vec<u8>,
    inflater: Option<Decompress>,
    finished: bool,
}

impl<'a, R: ReadAt> EntryReader<'a, R> {
    /// Next run of decompressed bytes, or `None` at end of stream.
    pub async fn next_chunk(&mut self) -> Result<Option<&[u8]>> {
        if self.inflater.is_some() {
            self.next_inflated().await
        } else {
            self.next_stored().await
        }
    }

    async fn next_stored(&mut self) -> Result<Option<&[u8]>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let n = self.remaining.min(self.output.len() as u64) as usize;
        self.reader
            .read_exact_at(self.offset, &mut self.output[..n])
            .await?;
        self.offset += n as u64;
        self.remaining -= n as u64;
        Ok(Some(&self.output[..n]))
    }

    async fn next_inflated(&mut self) -> Result<Option<&[u8]>> {
        loop {
            if self.finished {
                return Ok(None);
            }
            if self.input_pos == self.input.len() && self.remaining > 0 {
                self.fill_input().await?;
            }
            let Some(inflater) = self.inflater.as_mut() else {
                return Ok(None);
            };

            let (in_before, out_before) = (inflater.total_in(), inflater.total_out());
            let status = inflater
                .decompress(
                    &self.input[self.input_pos..],
                    &mut self.output,
                    FlushDecompress::None,
                )
                .map_err(|e| Error::malformed(format!("corrupt deflate stream: {e}")))?;
            let consumed = (inflater.total_in() - in_before) as usize;
            let produced = (inflater.total_out() - out_before) as usize;
            self.input_pos += consumed;

            if status == Status::StreamEnd {
                self.finished = true;
            }
            if produced > 0 {
                return Ok(Some(&self.output[..produced]));
            }
            if consumed == 0 && !self.finished {
                return Err(Error::malformed("truncated deflate stream"));
            }
        }
    }

    async fn fill_input(&mut self) -> Result<()> {
        let n = self.remaining.min(self.output.len() as u64) as usize;
        self.input.resize(n, 0);
        self.reader.read_exact_at(self.offset, &mut self.input).await?;
        self.offset += n as u64;
        self.remaining -= n as u64;
        self.input_pos = 0;
        Ok(())
    }
}

impl<R: ReadAt> ZipArchive<R> {
    /// Open the decompressed byte stream of a file entry.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedCompression`] for methods other than
    /// STORED and DEFLATE, and [`Error::MalformedArchive`] if the entry's
    /// local header is invalid.
    pub async fn open_entry(
        &self,
        entry: &ZipFileEntry,
        buffer_size: usize,
    ) -> Result<EntryReader<'_, R>> {
        let inflater = match entry.compression_method {
            CompressionMethod::Stored => None,
            // an empty deflate entry has nothing to inflate
            CompressionMethod::Deflate if entry.compressed_size == 0 => None,
            CompressionMethod::Deflate => Some(Decompress::new(false)),
            CompressionMethod::Unknown(method) => {
                return Err(Error::UnsupportedCompression(method));
            }
        };
        let offset = self.data_offset(entry).await?;
        let buffer_size = buffer_size.max(1);

        Ok(EntryReader {
            reader: self.reader().as_ref(),
            offset,
            remaining: entry.compressed_size,
            input: Vec::new(),
            input_pos: 0,
            output: vec![0u8; buffer_size],
            inflater,
            finished: false,
        })
    }
}

/// Output path of an archive entry below `output_dir`.
///
/// Entry names are `/` separated regardless of platform; each segment is
/// pushed onto `output_dir` in turn. Empty and `.` segments are dropped.
///
/// # Errors
///
/// Returns [`Error::UnsafeEntryName`] for absolute names and names with
/// segments that would leave `output_dir`.
pub fn entry_output_path(output_dir: &Path, name: &str) -> Result<PathBuf> {
    if name.starts_with('/') {
        return Err(Error::UnsafeEntryName(name.to_string()));
    }

    let mut path = output_dir.to_path_buf();
    for segment in name.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => path.push(part),
            _ => return Err(Error::UnsafeEntryName(name.to_string())),
        }
    }
    Ok(path)
}

/// Sequential ZIP extractor.
///
/// Entries are handled strictly in archive order: the next entry is only
/// requested once the current one has been fully written.
pub struct ZipExtractor<R: ReadAt> {
    archive: ZipArchive<R>,
    options: ExtractOptions,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub async fn open(reader: Arc<R>, options: ExtractOptions) -> Result<Self> {
        Ok(Self {
            archive: ZipArchive::open(reader).await?,
            options,
        })
    }

    /// Extract every remaining entry below `output_dir`.
    ///
    /// The first failure aborts extraction; files already written stay on disk.
    pub async fn extract_all(&mut self, output_dir: &Path) -> Result<ExtractSummary> {
        let mut summary = ExtractSummary::default();

        while let Some(entry) = self.archive.next_entry().await? {
            // placeholders that are not materialized never touch the disk
            if entry.is_directory && !self.options.create_directory_entries {
                trace!(entry = %entry.file_name, "skipping directory placeholder");
                summary.skipped += 1;
                continue;
            }

            let output_path = entry_output_path(output_dir, &entry.file_name)?;

            if entry.is_directory {
                ensure_dir_chain(&output_path).await?;
                trace!(entry = %entry.file_name, "created directory entry");
                continue;
            }

            if self.extract_entry(&entry, &output_path).await? {
                summary.files += 1;
            } else {
                summary.skipped += 1;
            }
        }

        debug!(
            files = summary.files,
            skipped = summary.skipped,
            output = %output_dir.display(),
            "extraction complete"
        );
        Ok(summary)
    }

    /// Write one file entry, returning `false` if an existing file was kept.
    async fn extract_entry(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<bool> {
        let mut stream = self
            .archive
            .open_entry(entry, self.options.buffer_size)
            .await?;

        ensure_parent_dirs(output_path).await?;

        if !self.options.overwrite
            && fs::try_exists(output_path)
                .await
                .map_err(|e| Error::io(output_path, e))?
        {
            debug!(entry = %entry.file_name, "skipping existing file");
            return Ok(false);
        }

        let write_err = |e| Error::io(output_path, e);
        let mut file = fs::File::create(output_path).await.map_err(write_err)?;
        let mut written = 0u64;
        while let Some(chunk) = stream.next_chunk().await? {
            file.write_all(chunk).await.map_err(write_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;

        trace!(entry = %entry.file_name, bytes = written, "extracted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_segments_onto_output_dir() {
        let out = Path::new("out");
        assert_eq!(
            entry_output_path(out, "a/b/c.txt").unwrap(),
            Path::new("out").join("a").join("b").join("c.txt")
        );
        assert_eq!(
            entry_output_path(out, "a//./b/").unwrap(),
            Path::new("out").join("a").join("b")
        );
    }

    #[test]
    fn rejects_escaping_names() {
        let out = Path::new("out");
        for name in ["../evil.txt", "a/../../evil.txt", "/etc/passwd"] {
            assert!(
                matches!(entry_output_path(out, name), Err(Error::UnsafeEntryName(_))),
                "{name} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn inflates_across_small_buffers() {
        use flate2::Compression;
        use flate2::write::DeflateEncoder;
        use std::io::Write;

        let text = "streaming entry data ".repeat(200);
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut reader = EntryReader {
            reader: &compressed,
            offset: 0,
            remaining: compressed.len() as u64,
            input: Vec::new(),
            input_pos: 0,
            output: vec![0u8; 7],
            inflater: Some(Decompress::new(false)),
            finished: false,
        };

        let mut out = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            out.extend_from_slice(chunk);
        }
        assert_eq!(out, text.as_bytes());
    }

    #[tokio::test]
    async fn truncated_deflate_data_is_malformed() {
        use flate2::Compression;
        use flate2::write::DeflateEncoder;
        use std::io::Write;

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[42u8; 4096]).unwrap();
        let mut compressed = encoder.finish().unwrap();
        compressed.truncate(compressed.len() / 2);

        let mut reader = EntryReader {
            reader: &compressed,
            offset: 0,
            remaining: compressed.len() as u64,
            input: Vec::new(),
            input_pos: 0,
            output: vec![0u8; 64],
            inflater: Some(Decompress::new(false)),
            finished: false,
        };

        let result = loop {
            match reader.next_chunk().await {
                Ok(Some(_)) => continue,
                other => break other.map(|_| ()),
            }
        };
        assert!(matches!(result, Err(Error::MalformedArchive(_))));
    }
}

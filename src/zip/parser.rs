//! Low-level ZIP archive parser.
//!
//! The archive is located from its tail: the End of Central Directory (EOCD)
//! record, and for large archives the ZIP64 EOCD it points to, is read once
//! when the archive is opened. Central Directory headers are then read one at
//! a time as the caller advances with [`ZipArchive::next_entry`], so only the
//! current header is ever held in memory.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Extra field id carrying ZIP64 sizes and offsets.
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// An opened archive with a cursor over its Central Directory.
pub struct ZipArchive<R: ReadAt> {
    reader: Arc<R>,
    /// Offset of the next Central Directory header to read
    next_header: u64,
    /// End of the Central Directory
    cd_end: u64,
    total_entries: u64,
    entries_read: u64,
}

impl<R: ReadAt> ZipArchive<R> {
    /// Locate the Central Directory of the archive behind `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedArchive`] if no valid EOCD can be found or
    /// the directory it describes lies outside the source.
    pub async fn open(reader: Arc<R>) -> Result<Self> {
        let (eocd, eocd_offset) = find_eocd(&*reader).await?;

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = read_zip64_eocd(&*reader, eocd_offset).await?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        let cd_end = cd_offset
            .checked_add(cd_size)
            .filter(|end| *end <= reader.size())
            .ok_or_else(|| Error::malformed("central directory lies outside the archive"))?;

        debug!(entries = total_entries, cd_offset, cd_size, "opened archive");

        Ok(Self {
            reader,
            next_header: cd_offset,
            cd_end,
            total_entries,
            entries_read: 0,
        })
    }

    /// Number of entries the archive declares.
    pub fn len(&self) -> u64 {
        self.total_entries
    }

    pub fn is_empty(&self) -> bool {
        self.total_entries == 0
    }

    /// Read the next Central Directory entry, or `None` once every declared
    /// entry has been returned.
    pub async fn next_entry(&mut self) -> Result<Option<ZipFileEntry>> {
        if self.entries_read >= self.total_entries {
            return Ok(None);
        }
        if self.next_header + CentralDirectoryHeader::SIZE as u64 > self.cd_end {
            return Err(Error::malformed(format!(
                "central directory ends after {} of {} entries",
                self.entries_read, self.total_entries
            )));
        }

        let mut fixed = [0u8; CentralDirectoryHeader::SIZE];
        self.reader.read_exact_at(self.next_header, &mut fixed).await?;
        let header = CentralDirectoryHeader::from_bytes(&fixed)?;

        let mut variable = vec![0u8; header.variable_length()];
        self.reader
            .read_exact_at(
                self.next_header + CentralDirectoryHeader::SIZE as u64,
                &mut variable,
            )
            .await?;

        self.next_header += (CentralDirectoryHeader::SIZE + variable.len()) as u64;
        self.entries_read += 1;

        parse_entry(&header, &variable).map(Some)
    }

    /// Offset where the entry's (possibly compressed) data begins.
    ///
    /// The Local File Header repeats the name and extra field with lengths
    /// that may differ from the Central Directory, so it has to be read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedArchive`] if the LFH is missing or invalid.
    pub async fn data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let mut lfh_buf = [0u8; LFH_SIZE];
        self.reader.read_exact_at(entry.lfh_offset, &mut lfh_buf).await?;

        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(Error::malformed(format!(
                "invalid local file header for {}",
                entry.file_name
            )));
        }

        // name and extra field lengths sit at fixed positions in the LFH
        let file_name_length = u16::from_le_bytes([lfh_buf[26], lfh_buf[27]]) as u64;
        let extra_field_length = u16::from_le_bytes([lfh_buf[28], lfh_buf[29]]) as u64;

        let data_offset = entry
            .lfh_offset
            .checked_add(LFH_SIZE as u64 + file_name_length + extra_field_length);
        let data_end = data_offset.and_then(|offset| offset.checked_add(entry.compressed_size));

        match (data_offset, data_end) {
            (Some(offset), Some(end)) if end <= self.reader.size() => Ok(offset),
            _ => Err(Error::malformed(format!(
                "data for {} lies outside the archive",
                entry.file_name
            ))),
        }
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

/// Find and parse the End of Central Directory record.
///
/// Tries the common no-comment layout first, then searches backwards through
/// the largest possible comment for the signature.
async fn find_eocd<R: ReadAt + ?Sized>(reader: &R) -> Result<(EndOfCentralDirectory, u64)> {
    let size = reader.size();
    if size < EndOfCentralDirectory::SIZE as u64 {
        return Err(Error::malformed("not a valid ZIP file"));
    }

    let offset = size - EndOfCentralDirectory::SIZE as u64;
    let mut buf = [0u8; EndOfCentralDirectory::SIZE];
    reader.read_exact_at(offset, &mut buf).await?;
    if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && buf[20..22] == [0, 0] {
        return Ok((EndOfCentralDirectory::from_bytes(&buf)?, offset));
    }

    let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(size);
    let search_start = size - search_size;
    let mut buf = vec![0u8; search_size as usize];
    reader.read_exact_at(search_start, &mut buf).await?;

    for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
        if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
            continue;
        }
        // the comment must run exactly to the end of the file
        let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
        if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
            let record = &buf[i..i + EndOfCentralDirectory::SIZE];
            let eocd = EndOfCentralDirectory::from_bytes(record)?;
            return Ok((eocd, search_start + i as u64));
        }
    }

    Err(Error::malformed("not a valid ZIP file"))
}

/// Read the ZIP64 EOCD through the locator that precedes the regular EOCD.
async fn read_zip64_eocd<R: ReadAt + ?Sized>(reader: &R, eocd_offset: u64) -> Result<Zip64EOCD> {
    let locator_offset = eocd_offset
        .checked_sub(Zip64EOCDLocator::SIZE as u64)
        .ok_or_else(|| Error::malformed("missing ZIP64 locator"))?;
    let mut locator_buf = [0u8; Zip64EOCDLocator::SIZE];
    reader.read_exact_at(locator_offset, &mut locator_buf).await?;
    let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

    let mut eocd64_buf = [0u8; Zip64EOCD::MIN_SIZE];
    reader.read_exact_at(locator.eocd64_offset, &mut eocd64_buf).await?;
    Zip64EOCD::from_bytes(&eocd64_buf)
}

/// Build an entry from a fixed header and its name / extra / comment bytes.
fn parse_entry(header: &CentralDirectoryHeader, variable: &[u8]) -> Result<ZipFileEntry> {
    let name_end = header.file_name_length as usize;
    let extra_end = name_end + header.extra_field_length as usize;

    // lossy so that non-UTF8 names still extract
    let file_name = String::from_utf8_lossy(&variable[..name_end]).into_owned();
    let is_directory = file_name.ends_with('/');

    let mut compressed_size = header.compressed_size as u64;
    let mut uncompressed_size = header.uncompressed_size as u64;
    let mut lfh_offset = header.lfh_offset as u64;

    let extra = &variable[name_end..extra_end];
    let mut cursor = Cursor::new(extra);
    while cursor.position() + 4 <= extra.len() as u64 {
        let header_id = cursor.read_u16::<LittleEndian>().map_err(truncated_extra)?;
        let field_size = cursor.read_u16::<LittleEndian>().map_err(truncated_extra)? as u64;
        let field_end = cursor.position() + field_size;

        if header_id == ZIP64_EXTRA_ID {
            // values are present only for header fields saturated at 0xFFFFFFFF, in this order
            for (value, saturated) in [
                (&mut uncompressed_size, header.uncompressed_size == u32::MAX),
                (&mut compressed_size, header.compressed_size == u32::MAX),
                (&mut lfh_offset, header.lfh_offset == u32::MAX),
            ] {
                if saturated && cursor.position() + 8 <= field_end {
                    *value = cursor.read_u64::<LittleEndian>().map_err(truncated_extra)?;
                }
            }
        }
        cursor.set_position(field_end);
    }

    Ok(ZipFileEntry {
        file_name,
        compression_method: CompressionMethod::from_u16(header.compression_method),
        compressed_size,
        uncompressed_size,
        lfh_offset,
        is_directory,
    })
}

fn truncated_extra(_: std::io::Error) -> Error {
    Error::malformed("truncated extra field")
}

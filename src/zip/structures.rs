use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor};

use crate::error::{Error, Result};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// Verify the leading signature and hand the remaining bytes to `parse`.
fn parse_record<T>(
    data: &[u8],
    signature: &[u8],
    min_size: usize,
    what: &str,
    parse: impl FnOnce(&mut Cursor<&[u8]>) -> io::Result<T>,
) -> Result<T> {
    if data.len() < min_size || &data[0..4] != signature {
        return Err(Error::malformed(format!("invalid {what}")));
    }
    let mut cursor = Cursor::new(&data[4..]);
    parse(&mut cursor).map_err(|_| Error::malformed(format!("truncated {what}")))
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        parse_record(data, Self::SIGNATURE, Self::SIZE, "end of central directory", |c| {
            let _disk_number = c.read_u16::<LittleEndian>()?;
            let _disk_with_cd = c.read_u16::<LittleEndian>()?;
            Ok(Self {
                disk_entries: c.read_u16::<LittleEndian>()?,
                total_entries: c.read_u16::<LittleEndian>()?,
                cd_size: c.read_u32::<LittleEndian>()?,
                cd_offset: c.read_u32::<LittleEndian>()?,
            })
        })
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EOCDLocator {
    pub eocd64_offset: u64,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        parse_record(data, Self::SIGNATURE, Self::SIZE, "ZIP64 locator", |c| {
            let _disk_with_eocd64 = c.read_u32::<LittleEndian>()?;
            Ok(Self {
                eocd64_offset: c.read_u64::<LittleEndian>()?,
            })
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
pub struct Zip64EOCD {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        parse_record(
            data,
            Self::SIGNATURE,
            Self::MIN_SIZE,
            "ZIP64 end of central directory",
            |c| {
                // record size, versions, disk numbers
                c.set_position(8 + 2 + 2 + 4 + 4);
                let _disk_entries = c.read_u64::<LittleEndian>()?;
                Ok(Self {
                    total_entries: c.read_u64::<LittleEndian>()?,
                    cd_size: c.read_u64::<LittleEndian>()?,
                    cd_offset: c.read_u64::<LittleEndian>()?,
                })
            },
        )
    }
}

/// Fixed 46-byte part of a Central Directory File Header.
pub struct CentralDirectoryHeader {
    pub compression_method: u16,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub file_comment_length: u16,
    pub lfh_offset: u32,
}

impl CentralDirectoryHeader {
    pub const SIGNATURE: &'static [u8] = b"PK\x01\x02";
    pub const SIZE: usize = 46;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        parse_record(data, Self::SIGNATURE, Self::SIZE, "central directory file header", |c| {
            let _version_made_by = c.read_u16::<LittleEndian>()?;
            let _version_needed = c.read_u16::<LittleEndian>()?;
            let _flags = c.read_u16::<LittleEndian>()?;
            let compression_method = c.read_u16::<LittleEndian>()?;
            let _last_mod_time = c.read_u16::<LittleEndian>()?;
            let _last_mod_date = c.read_u16::<LittleEndian>()?;
            let _crc32 = c.read_u32::<LittleEndian>()?;
            let compressed_size = c.read_u32::<LittleEndian>()?;
            let uncompressed_size = c.read_u32::<LittleEndian>()?;
            let file_name_length = c.read_u16::<LittleEndian>()?;
            let extra_field_length = c.read_u16::<LittleEndian>()?;
            let file_comment_length = c.read_u16::<LittleEndian>()?;
            let _disk_number_start = c.read_u16::<LittleEndian>()?;
            let _internal_attrs = c.read_u16::<LittleEndian>()?;
            let _external_attrs = c.read_u32::<LittleEndian>()?;
            let lfh_offset = c.read_u32::<LittleEndian>()?;
            Ok(Self {
                compression_method,
                compressed_size,
                uncompressed_size,
                file_name_length,
                extra_field_length,
                file_comment_length,
                lfh_offset,
            })
        })
    }

    /// Length of the variable part following the fixed header.
    pub fn variable_length(&self) -> usize {
        self.file_name_length as usize
            + self.extra_field_length as usize
            + self.file_comment_length as usize
    }
}

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// One archive entry as described by the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipFileEntry {
    /// Forward-slash separated name relative to the archive root.
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub lfh_offset: u64,
    /// Name ends with `/`: a directory placeholder with no content.
    pub is_directory: bool,
}

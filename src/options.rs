//! Caller-supplied settings for reading and extraction.

use std::fs::OpenOptions;

/// Default chunk size used when streaming entry data out of an archive.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// How a file is opened before reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenFlag {
    /// Open for reading only.
    #[default]
    Read,
    /// Open for reading and writing; the file must already exist.
    ReadWrite,
    /// Open for reading with synchronous I/O semantics where the platform has them.
    ReadSync,
}

impl OpenFlag {
    pub(crate) fn open_options(self) -> OpenOptions {
        let mut opts = OpenOptions::new();
        opts.read(true);
        match self {
            OpenFlag::Read => {}
            OpenFlag::ReadWrite => {
                opts.write(true);
            }
            OpenFlag::ReadSync => {
                #[cfg(unix)]
                {
                    use std::os::unix::fs::OpenOptionsExt;
                    opts.custom_flags(libc::O_SYNC);
                }
            }
        }
        opts
    }
}

/// Text decoding applied to file bytes before JSON parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Strict UTF-8; invalid sequences are an error.
    Utf8,
    /// ISO-8859-1: every byte maps to the char with the same code point.
    Latin1,
}

/// Options for [`read_json`](crate::read_json).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub flag: OpenFlag,
    /// `None` reads raw bytes and re-stringifies them as UTF-8 (lossy).
    pub encoding: Option<Encoding>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flag(mut self, flag: OpenFlag) -> Self {
        self.flag = flag;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Decode raw bytes according to the configured encoding.
    pub(crate) fn decode(
        &self,
        bytes: Vec<u8>,
    ) -> std::result::Result<String, std::string::FromUtf8Error> {
        match self.encoding {
            None => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Some(Encoding::Utf8) => String::from_utf8(bytes),
            Some(Encoding::Latin1) => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Options for [`extract_zip_with`](crate::extract_zip_with).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Replace files that already exist at an output path.
    pub overwrite: bool,
    /// Materialize directory placeholder entries as (possibly empty) directories.
    pub create_directory_entries: bool,
    /// Chunk size for streaming entry bytes.
    pub buffer_size: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            create_directory_entries: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_directory_entries(mut self, create: bool) -> Self {
        self.create_directory_entries = create;
        self
    }

    /// Zero is treated as one byte.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_defaults_match_plain_unzip() {
        let opts = ExtractOptions::default();
        assert!(opts.overwrite);
        assert!(!opts.create_directory_entries);
        assert_eq!(opts.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(ExtractOptions::new().with_buffer_size(0).buffer_size, 1);
    }

    #[test]
    fn decode_raw_bytes_is_lossy() {
        let text = ReadOptions::default().decode(vec![b'"', 0xff, b'"']).unwrap();
        assert_eq!(text, "\"\u{fffd}\"");
    }

    #[test]
    fn decode_strict_utf8_rejects_invalid_bytes() {
        let opts = ReadOptions::new().with_encoding(Encoding::Utf8);
        assert!(opts.decode(vec![0xff]).is_err());
        assert_eq!(opts.decode(b"{}".to_vec()).unwrap(), "{}");
    }

    #[test]
    fn decode_latin1_maps_bytes_to_chars() {
        let opts = ReadOptions::new().with_encoding(Encoding::Latin1);
        assert_eq!(opts.decode(vec![b'"', 0xe9, b'"']).unwrap(), "\"é\"");
    }
}

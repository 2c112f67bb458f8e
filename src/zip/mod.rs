//! ZIP archive reading and extraction.
//!
//! - [`structures`]: fixed-layout records (EOCD, ZIP64 records, Central Directory headers)
//! - [`parser`]: locating the Central Directory and iterating it one entry at a time
//! - [`extractor`]: streaming entry data and writing entries below an output directory
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The EOCD is read first (from the end of the file) and the Central
//! Directory is then walked lazily, so opening an archive never loads every
//! entry into memory.
//!
//! ## Limitations
//!
//! - STORED and DEFLATE only
//! - No encryption or multi-disk archives
//! - CRC32 values are not verified

mod extractor;
mod parser;
mod structures;

pub use extractor::{EntryReader, ExtractSummary, ZipExtractor, entry_output_path};
pub use parser::ZipArchive;
pub use structures::{CompressionMethod, ZipFileEntry};

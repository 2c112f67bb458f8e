//! # fsaccess
//!
//! A small file access facade: existence checks, directory listing, JSON
//! reading, forced recursive deletion and streaming ZIP extraction.
//!
//! Extraction walks the archive's Central Directory one entry at a time and
//! streams each file's bytes to disk before asking for the next entry.
//! Parent directories are created on demand as files are written, so
//! directory placeholder entries are skipped unless
//! [`ExtractOptions::create_directory_entries`] is set.
//!
//! ## Features
//!
//! - STORED and DEFLATE entries, ZIP64 archives
//! - Entry names that would escape the output directory are rejected
//! - Typed JSON reading through `serde`
//!
//! ## Example
//!
//! ```no_run
//! use fsaccess::{FileSystem, ReadOptions};
//!
//! #[tokio::main]
//! async fn main() -> fsaccess::Result<()> {
//!     let fs = FileSystem::new();
//!
//!     if fs.exists("bundle.zip")? {
//!         let summary = fs.extract_zip("bundle.zip", "out").await?;
//!         println!("extracted {} files", summary.files);
//!     }
//!
//!     for name in fs.read_dir("out")? {
//!         println!("{name}");
//!     }
//!
//!     let manifest: serde_json::Value =
//!         fs.read_json("out/manifest.json", &ReadOptions::default())?;
//!     println!("{manifest}");
//!
//!     fs.delete("out")
//! }
//! ```

pub mod dirs;
pub mod error;
pub mod fs;
pub mod io;
pub mod options;
pub mod zip;

pub use dirs::ensure_parent_dirs;
pub use error::{Error, Result};
pub use fs::{
    FileSystem, delete, exists, extract_from_reader, extract_zip, extract_zip_with, read_dir,
    read_json,
};
pub use io::{LocalFileReader, ReadAt};
pub use options::{Encoding, ExtractOptions, OpenFlag, ReadOptions};
pub use crate::zip::{ExtractSummary, ZipArchive, ZipFileEntry};

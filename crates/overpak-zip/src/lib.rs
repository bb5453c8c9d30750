//! Read-only ZIP container reader.
//!
//! Parses a ZIP central directory without scanning the whole file and
//! resolves every entry's data offset by reading its local header:
//!
//! 1. The tail scanner ([`scan`]) finds the End-Of-Central-Directory record
//!    in the last `22 + 65 535` bytes.
//! 2. The central directory parser ([`directory`]) walks one fixed-layout
//!    record per entry.
//! 3. The local header resolver ([`resolve`]) computes where each entry's
//!    data begins.
//!
//! Entries are then served as a [`ByteSource`]: a zero-copy
//! `(archive, offset, length)` range for stored entries, or an inflating
//! stream obtained from a per-archive [`DecoderHandle`] for deflated ones.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use overpak_zip::{ArchiveFile, ByteSource, EntryRange, ParseOptions};
//!
//! let path = "main.3.com.example.game.obb";
//! let archive = Arc::new(ArchiveFile::open(path, &ParseOptions::default())?);
//!
//! if let Some(entry) = archive.find("textures/logo.png") {
//!     if entry.is_stored() {
//!         let range = EntryRange::stored(Arc::clone(&archive), entry);
//!         println!("{} bytes at offset {}", range.len(), range.offset());
//!     }
//! }
//! # Ok::<(), overpak_zip::Error>(())
//! ```

mod archive;
mod decoder;
mod entry;
mod error;
mod options;
mod reader;
mod source;

pub mod directory;
pub mod format;
pub mod resolve;
pub mod scan;

#[cfg(test)]
mod testutil;

pub use archive::{parse_entries, ArchiveFile};
pub use decoder::DecoderHandle;
pub use entry::{normalize_path, EntryRecord};
pub use error::{Error, Result};
pub use format::CompressionMethod;
pub use options::ParseOptions;
pub use reader::{BinaryReader, ReadError};
pub use source::{ByteSource, EntryRange, EntryReader, InflateStream, RangeReader};

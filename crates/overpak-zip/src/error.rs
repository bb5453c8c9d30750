//! Error types for the ZIP reader.

use std::path::PathBuf;

use thiserror::Error;

use crate::reader::ReadError;

/// Errors that can occur when opening or reading a ZIP container.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive file could not be opened, inspected or mapped.
    #[error("{}: cannot read archive: {source}", .archive.display())]
    Open {
        archive: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is shorter than the smallest possible end-of-central-directory record.
    #[error("{}: file too small to be an archive ({len} bytes)", .archive.display())]
    TooSmall { archive: PathBuf, len: u64 },

    /// The file does not start with a local header or has no EOCD record.
    #[error("{}: not an archive: {reason}", .archive.display())]
    NotAnArchive {
        archive: PathBuf,
        reason: &'static str,
    },

    /// Central directory bounds, entry count or record signature are invalid.
    #[error("{}: corrupt central directory: {reason}", .archive.display())]
    CorruptDirectory { archive: PathBuf, reason: String },

    /// The local header of an entry disagrees with the central directory.
    #[error("{}: corrupt entry '{entry}': {reason}", .archive.display())]
    CorruptEntry {
        archive: PathBuf,
        entry: String,
        reason: String,
    },

    /// The entry uses a compression method other than stored or deflate.
    #[error("{}: entry '{entry}' uses unsupported compression method {method}", .archive.display())]
    UnsupportedCompressionMethod {
        archive: PathBuf,
        entry: String,
        method: u16,
    },

    /// The entry is flagged as encrypted.
    #[error("{}: entry '{entry}' is encrypted", .archive.display())]
    Encrypted { archive: PathBuf, entry: String },

    /// Inflated data did not match the recorded CRC-32 or length.
    #[error(
        "entry '{entry}' failed verification: expected crc {expected:#010x}/{expected_len} \
         bytes, got {actual:#010x}/{actual_len} bytes"
    )]
    CrcMismatch {
        entry: String,
        expected: u32,
        actual: u32,
        expected_len: u64,
        actual_len: u64,
    },

    /// Low-level cursor error outside of any archive context.
    #[error("{0}")]
    Reader(#[from] ReadError),
}

/// Result type for ZIP operations.
pub type Result<T> = std::result::Result<T, Error>;

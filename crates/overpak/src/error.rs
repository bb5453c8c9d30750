//! Error types for archive sets.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading or reading an archive set.
#[derive(Debug, Error)]
pub enum Error {
    /// An archive failed to parse, or an entry failed to open.
    #[error(transparent)]
    Archive(#[from] overpak_zip::Error),

    /// I/O error outside of any single archive (e.g. scanning a directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The list of archives to load was empty.
    #[error("no archives to load")]
    NoArchives,

    /// No entry is indexed under the given path.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// The entry was looked up in a different archive set.
    #[error("entry '{0}' does not belong to this archive set")]
    ForeignEntry(String),

    /// A pinned expansion file version does not exist on disk.
    #[error("expansion file not found: {}", .0.display())]
    MissingExpansion(PathBuf),
}

/// Result type for archive set operations.
pub type Result<T> = std::result::Result<T, Error>;

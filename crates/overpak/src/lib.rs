//! Overlay of expansion archives as one read-only asset namespace.
//!
//! An [`ArchiveSet`] loads archives in order (typically `main`, then
//! `patch`) and keeps a single path index where the archive loaded last wins.
//! Entries are opened as a [`ByteSource`]: stored entries as a zero-copy
//! range of the memory-mapped archive, deflated entries as an inflating
//! stream obtained through a per-archive decoder handle that is opened once
//! and cached until [`ArchiveSet::close`].
//!
//! # Example
//!
//! ```no_run
//! use overpak::{open_archive_set, ByteSource};
//!
//! let set = open_archive_set(["main.3.com.example.game.obb", "patch.4.com.example.game.obb"])?;
//!
//! for entry in set.list("textures/") {
//!     match set.open(entry)? {
//!         ByteSource::Range(range) => {
//!             println!("{}: {} bytes at {}", entry.path(), range.len(), range.offset())
//!         }
//!         ByteSource::Stream(stream) => {
//!             println!("{}: {} bytes inflated", entry.path(), stream.uncompressed_size())
//!         }
//!     }
//! }
//!
//! set.close();
//! # Ok::<(), overpak::Error>(())
//! ```

mod cache;
mod config;
mod discovery;
mod error;
mod index;
mod set;

#[cfg(test)]
mod testutil;

pub use cache::{DecompressionHandleCache, SharedDecoder};
pub use config::ArchiveSetConfig;
pub use discovery::{ExpansionFile, ExpansionKind, ExpansionLocator, DEFAULT_EXTENSION};
pub use error::{Error, Result};
pub use index::{ArchiveId, MergeReport, OverlayIndex, Slot};
pub use set::{directory_prefix, ArchiveSet, EntryDescriptor};

pub use overpak_zip::{
    ArchiveFile, ByteSource, CompressionMethod, EntryRange, EntryReader, EntryRecord, InflateStream,
    ParseOptions,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Load `paths` in order with the default configuration.
pub fn open_archive_set<I, P>(paths: I) -> Result<ArchiveSet>
where
    I: IntoIterator<Item = P>,
    P: AsRef<std::path::Path>,
{
    ArchiveSet::load(paths, ArchiveSetConfig::default())
}

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        directory_prefix, open_archive_set, ArchiveSet, ArchiveSetConfig, ByteSource,
        EntryDescriptor, Error, ExpansionLocator, Result,
    };
}

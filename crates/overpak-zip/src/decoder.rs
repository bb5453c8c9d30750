//! Per-archive decoder handle for deflated entries.
//!
//! A handle resolves entries by their exact stored name against the
//! archive's own parsed directory, then hands out an inflating stream over
//! the entry's compressed range. Building the name table walks every entry,
//! so callers keep one handle per archive and reuse it.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::archive::ArchiveFile;
use crate::entry::EntryRecord;
use crate::format::CompressionMethod;
use crate::source::{EntryRange, InflateStream};
use crate::{Error, Result};

/// Decoder state for one archive. Not reentrant: serialize access per handle.
pub struct DecoderHandle {
    archive: Arc<ArchiveFile>,
    /// Stored name to entry index; the last record of a repeated name wins.
    names: FxHashMap<String, usize>,
    streams_opened: u64,
}

impl DecoderHandle {
    /// Open a decoder over an already-parsed archive.
    pub fn open(archive: Arc<ArchiveFile>) -> Self {
        let names = archive
            .entries()
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.raw_name().to_string(), index))
            .collect::<FxHashMap<_, _>>();

        debug!(
            archive = %archive.path().display(),
            entries = names.len(),
            "opened decoder handle"
        );

        Self {
            archive,
            names,
            streams_opened: 0,
        }
    }

    /// The archive this handle decodes.
    #[inline]
    pub fn archive(&self) -> &Arc<ArchiveFile> {
        &self.archive
    }

    /// Number of streams handed out so far.
    #[inline]
    pub fn streams_opened(&self) -> u64 {
        self.streams_opened
    }

    /// Open the deflated entry stored under exactly `raw_name`.
    pub fn open_path(&mut self, raw_name: &str, verify_crc: bool) -> Result<InflateStream> {
        let archive = Arc::clone(&self.archive);
        let entry = self
            .names
            .get(raw_name)
            .and_then(|&index| archive.entries().get(index))
            .ok_or_else(|| Error::CorruptEntry {
                archive: archive.path().to_path_buf(),
                entry: raw_name.to_string(),
                reason: "no entry with this exact name".to_string(),
            })?;
        self.open_entry(entry, verify_crc)
    }

    /// Open an inflating stream for a deflated entry of this archive.
    ///
    /// The entry is looked up again by its stored name; the record found
    /// must be the one passed in.
    pub fn open_entry(&mut self, entry: &EntryRecord, verify_crc: bool) -> Result<InflateStream> {
        let archive_path = self.archive.path();

        if entry.compression_method() != Ok(CompressionMethod::Deflated) {
            return Err(Error::UnsupportedCompressionMethod {
                archive: archive_path.to_path_buf(),
                entry: entry.path().to_string(),
                method: entry.method_code(),
            });
        }

        let resolved = self
            .names
            .get(entry.raw_name())
            .and_then(|&index| self.archive.entries().get(index));
        let Some(resolved) = resolved.filter(|r| {
            r.data_offset() == entry.data_offset() && r.compressed_size() == entry.compressed_size()
        }) else {
            return Err(Error::CorruptEntry {
                archive: archive_path.to_path_buf(),
                entry: entry.path().to_string(),
                reason: format!(
                    "entry data at {} is not the data stored under '{}' in this archive",
                    entry.data_offset(),
                    entry.raw_name()
                ),
            });
        };

        trace!(entry = resolved.path(), offset = resolved.data_offset(), "inflating entry");
        self.streams_opened += 1;
        let range = EntryRange::compressed(Arc::clone(&self.archive), resolved);
        Ok(InflateStream::new(range, resolved, verify_crc))
    }
}

impl std::fmt::Debug for DecoderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderHandle")
            .field("archive", &self.archive.path())
            .field("entries", &self.names.len())
            .field("streams_opened", &self.streams_opened)
            .finish()
    }
}

//! A single opened archive.
//!
//! Opening runs the whole parse pipeline once: tail scan, central directory
//! walk, then one local header read per entry. The result is immutable.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use crate::directory;
use crate::entry::EntryRecord;
use crate::format::EocdRecord;
use crate::options::ParseOptions;
use crate::resolve::resolve_entry;
use crate::scan;
use crate::{Error, Result};

/// One physical container and the entries it contributes.
pub struct ArchiveFile {
    path: PathBuf,
    file: File,
    /// Memory-mapped file data
    mmap: Mmap,
    entries: Vec<EntryRecord>,
}

impl ArchiveFile {
    /// Open and fully parse an archive.
    pub fn open<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        let read_error = |source| Error::Open {
            archive: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(read_error)?;
        let len = file.metadata().map_err(read_error)?.len();

        // Mapping an empty file fails on some platforms; report it as too small instead.
        if len < EocdRecord::SIZE as u64 {
            return Err(Error::TooSmall {
                archive: path.to_path_buf(),
                len,
            });
        }

        let mmap = unsafe { Mmap::map(&file) }.map_err(read_error)?;
        let entries = parse_entries(path, &mmap, options)?;

        debug!(
            archive = %path.display(),
            entries = entries.len(),
            bytes = len,
            "opened archive"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            mmap,
            entries,
        })
    }

    /// Path the archive was opened from.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total length of the archive in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// The underlying file handle, for callers that want to issue their own reads.
    #[inline]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// The whole archive as a memory-mapped slice.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.mmap
    }

    /// Entries in central directory order.
    #[inline]
    pub fn entries(&self) -> &[EntryRecord] {
        &self.entries
    }

    /// Number of entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Find an entry by normalized path. The last record wins on duplicates.
    pub fn find(&self, path: &str) -> Option<&EntryRecord> {
        let normalized = crate::entry::normalize_path(path);
        self.entries.iter().rev().find(|e| e.path() == normalized)
    }

    /// Raw (possibly compressed) bytes of an entry.
    ///
    /// Bounds were validated when the entry was resolved.
    pub fn raw_bytes(&self, entry: &EntryRecord) -> &[u8] {
        let start = entry.data_offset() as usize;
        &self.mmap[start..start + entry.compressed_size() as usize]
    }
}

impl std::fmt::Debug for ArchiveFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveFile")
            .field("path", &self.path)
            .field("len", &self.mmap.len())
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Run the parse pipeline over an in-memory archive image.
///
/// `archive` is only used to label errors.
pub fn parse_entries(
    archive: &Path,
    data: &[u8],
    options: &ParseOptions,
) -> Result<Vec<EntryRecord>> {
    let eocd_offset = scan::locate_eocd(archive, data)?;
    let location = directory::read_location(archive, data, eocd_offset)?;
    let central = directory::read_entries(archive, data, &location)?;

    central
        .into_iter()
        .map(|entry| resolve_entry(archive, data, entry, options))
        .collect()
}

//! Decoder handle cache.
//!
//! Opening a [`DecoderHandle`] builds a name map over every entry of the
//! archive, so one handle is kept per archive for the lifetime of the set.
//! Handles are not reentrant; each sits behind its own mutex.

use std::sync::Arc;

use overpak_zip::{ArchiveFile, DecoderHandle};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::index::ArchiveId;

/// Shared handle to one archive's decoder.
pub type SharedDecoder = Arc<Mutex<DecoderHandle>>;

/// Lazily populated map from archive to decoder handle.
#[derive(Debug, Default)]
pub struct DecompressionHandleCache {
    handles: Mutex<FxHashMap<ArchiveId, SharedDecoder>>,
}

impl DecompressionHandleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle for `id`, opening it on first use.
    ///
    /// The map stays locked while a handle is opened, so two concurrent first
    /// uses of one archive open it once.
    pub fn get_or_open(&self, id: ArchiveId, archive: &Arc<ArchiveFile>) -> SharedDecoder {
        let mut handles = self.handles.lock();
        if let Some(handle) = handles.get(&id) {
            return Arc::clone(handle);
        }

        let handle = Arc::new(Mutex::new(DecoderHandle::open(Arc::clone(archive))));
        handles.insert(id, Arc::clone(&handle));
        debug!(archive = %archive.path().display(), id = %id, "cached decoder handle");
        handle
    }

    /// Whether a handle for `id` has been opened.
    pub fn contains(&self, id: ArchiveId) -> bool {
        self.handles.lock().contains_key(&id)
    }

    /// Number of open handles.
    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every handle, returning how many were open.
    ///
    /// Streams already handed out keep working: they hold the archive, not
    /// the handle.
    pub fn clear(&self) -> usize {
        let mut handles = self.handles.lock();
        let count = handles.len();
        handles.clear();
        count
    }
}

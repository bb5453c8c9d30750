//! The overlay index: one winning entry per path.
//!
//! Archives are merged in load order. Merging is an explicit step with a
//! single rule: **the entry merged last wins**. A later archive therefore
//! shadows every identically named path of the archives before it, and a
//! path repeated inside one archive resolves to its last record.

use std::collections::BTreeMap;
use std::ops::Bound;

use overpak_zip::EntryRecord;
use tracing::debug;

/// Position of an archive inside its set, in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ArchiveId(pub(crate) usize);

impl ArchiveId {
    /// Load-order index of the archive.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where the winning entry for a path lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Archive that contributed the entry.
    pub archive: ArchiveId,
    /// Index into that archive's entry list.
    pub entry: usize,
}

/// Outcome of merging one archive into the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Paths that were not indexed before.
    pub inserted: usize,
    /// Paths that replaced an entry from an earlier archive.
    pub shadowed: usize,
    /// Paths that replaced an earlier record of the same archive.
    pub duplicates: usize,
}

impl MergeReport {
    /// Number of records processed.
    pub fn total(&self) -> usize {
        self.inserted + self.shadowed + self.duplicates
    }
}

/// Path-keyed map from normalized path to the currently winning entry.
///
/// Kept ordered so that directory listings are range scans.
#[derive(Debug, Clone, Default)]
pub struct OverlayIndex {
    slots: BTreeMap<String, Slot>,
}

impl OverlayIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the entries of `archive` with last-wins precedence.
    pub fn merge(&mut self, archive: ArchiveId, entries: &[EntryRecord]) -> MergeReport {
        let mut report = MergeReport::default();

        for (entry, record) in entries.iter().enumerate() {
            let slot = Slot { archive, entry };
            match self.slots.insert(record.path().to_string(), slot) {
                None => report.inserted += 1,
                Some(previous) if previous.archive == archive => report.duplicates += 1,
                Some(previous) => {
                    debug!(
                        path = record.path(),
                        shadowed = %previous.archive,
                        by = %archive,
                        "entry shadowed by later archive"
                    );
                    report.shadowed += 1;
                }
            }
        }

        report
    }

    /// The winning slot for an already-normalized path.
    #[inline]
    pub fn get(&self, path: &str) -> Option<Slot> {
        self.slots.get(path).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All paths in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Slot)> + '_ {
        self.slots.iter().map(|(path, slot)| (path.as_str(), *slot))
    }

    /// All paths starting with `prefix`, in order.
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, Slot)> + 'a {
        self.slots
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(path, _)| path.starts_with(prefix))
            .map(|(path, slot)| (path.as_str(), *slot))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

//! The archive set: several archives overlaid into one namespace.

use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use overpak_zip::{
    normalize_path, ArchiveFile, ByteSource, CompressionMethod, EntryRange, EntryRecord,
};
use tracing::{debug, info};

use crate::cache::DecompressionHandleCache;
use crate::config::ArchiveSetConfig;
use crate::discovery::ExpansionLocator;
use crate::index::{ArchiveId, MergeReport, OverlayIndex, Slot};
use crate::{Error, Result};

/// Turn a user-supplied directory name into the literal prefix taken by
/// [`ArchiveSet::list`] and [`ArchiveSet::subdirectories`].
///
/// `"assets"` becomes `"assets/"`; the root stays `""`.
pub fn directory_prefix(path: &str) -> String {
    let mut prefix = normalize_path(path);
    if !prefix.is_empty() && !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

/// An entry as seen through the overlay, together with the archive it came from.
///
/// Borrowed from its [`ArchiveSet`]; only that set can [`open`](ArchiveSet::open) it.
#[derive(Debug, Clone, Copy)]
pub struct EntryDescriptor<'a> {
    id: ArchiveId,
    archive: &'a Arc<ArchiveFile>,
    record: &'a EntryRecord,
}

impl<'a> EntryDescriptor<'a> {
    /// Load-order id of the owning archive.
    #[inline]
    pub fn archive_id(&self) -> ArchiveId {
        self.id
    }

    #[inline]
    pub fn archive(&self) -> &'a Arc<ArchiveFile> {
        self.archive
    }

    #[inline]
    pub fn archive_path(&self) -> &'a Path {
        self.archive.path()
    }

    #[inline]
    pub fn record(&self) -> &'a EntryRecord {
        self.record
    }
}

impl Deref for EntryDescriptor<'_> {
    type Target = EntryRecord;

    fn deref(&self) -> &EntryRecord {
        self.record
    }
}

/// Ordered archives plus the last-wins index over their entries.
///
/// Loading takes `&mut self`; lookups and opens take `&self` and may run from
/// many threads at once.
#[derive(Debug, Default)]
pub struct ArchiveSet {
    config: ArchiveSetConfig,
    archives: Vec<Arc<ArchiveFile>>,
    index: OverlayIndex,
    decoders: DecompressionHandleCache,
}

impl ArchiveSet {
    /// An empty set.
    pub fn new(config: ArchiveSetConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Open `paths` in order; later archives shadow earlier ones.
    ///
    /// Fails on the first archive that does not parse.
    pub fn load<I, P>(paths: I, config: ArchiveSetConfig) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut set = Self::new(config);
        for path in paths {
            set.add_archive(path)?;
        }
        if set.archives.is_empty() {
            return Err(Error::NoArchives);
        }
        Ok(set)
    }

    /// Resolve the expansion files of a package and load them.
    pub fn discover(locator: &ExpansionLocator, config: ArchiveSetConfig) -> Result<Self> {
        Self::load(locator.resolve()?, config)
    }

    /// Parse one more archive and merge it on top of the current index.
    ///
    /// On failure the set is left unchanged.
    pub fn add_archive<P: AsRef<Path>>(&mut self, path: P) -> Result<MergeReport> {
        let path = path.as_ref();
        let archive = Arc::new(ArchiveFile::open(path, &self.config.parse)?);
        let id = ArchiveId(self.archives.len());

        let report = self.index.merge(id, archive.entries());
        self.archives.push(archive);

        info!(
            archive = %path.display(),
            id = %id,
            inserted = report.inserted,
            shadowed = report.shadowed,
            duplicates = report.duplicates,
            "loaded archive"
        );
        Ok(report)
    }

    #[inline]
    pub fn config(&self) -> &ArchiveSetConfig {
        &self.config
    }

    /// Archives in load order.
    #[inline]
    pub fn archives(&self) -> &[Arc<ArchiveFile>] {
        &self.archives
    }

    #[inline]
    pub fn archive(&self, id: ArchiveId) -> Option<&Arc<ArchiveFile>> {
        self.archives.get(id.0)
    }

    #[inline]
    pub fn index(&self) -> &OverlayIndex {
        &self.index
    }

    /// Number of distinct paths.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn descriptor(&self, slot: Slot) -> Option<EntryDescriptor<'_>> {
        let archive = self.archives.get(slot.archive.0)?;
        let record = archive.entries().get(slot.entry)?;
        Some(EntryDescriptor {
            id: slot.archive,
            archive,
            record,
        })
    }

    /// The winning entry for `path`.
    pub fn lookup(&self, path: &str) -> Option<EntryDescriptor<'_>> {
        let slot = self.index.get(&normalize_path(path))?;
        self.descriptor(slot)
    }

    /// Whether some entry is indexed under `path`.
    pub fn exists(&self, path: &str) -> bool {
        self.index.get(&normalize_path(path)).is_some()
    }

    /// Whether `path` is a directory, i.e. some entry lives below it.
    ///
    /// The empty path is the root.
    pub fn is_directory(&self, path: &str) -> bool {
        let dir = normalize_path(path);
        let dir = dir.trim_end_matches('/');
        if dir.is_empty() {
            return !self.index.is_empty();
        }
        let prefix = format!("{dir}/");
        let found = self.index.with_prefix(&prefix).next().is_some();
        found
    }

    /// Direct children of `prefix`, sorted by path.
    ///
    /// An entry is a direct child when its path starts with `prefix` and has
    /// no `/` after it. Pass `""` for the root and `"dir/"` for a directory;
    /// the prefix is matched literally. Directory markers and nested entries
    /// are not children.
    pub fn list(&self, prefix: &str) -> Vec<EntryDescriptor<'_>> {
        let prefix = normalize_path(prefix);
        self.index
            .with_prefix(&prefix)
            .filter(|(path, _)| {
                let rest = &path[prefix.len()..];
                !rest.is_empty() && !rest.contains('/')
            })
            .filter_map(|(_, slot)| self.descriptor(slot))
            .collect()
    }

    /// Directories directly below `prefix`, inferred from entry paths.
    ///
    /// Returned with a trailing `/`, sorted.
    pub fn subdirectories(&self, prefix: &str) -> Vec<String> {
        let prefix = normalize_path(prefix);
        let mut dirs: Vec<String> = self
            .index
            .with_prefix(&prefix)
            .filter_map(|(path, _)| {
                let rest = &path[prefix.len()..];
                let (name, _) = rest.split_once('/')?;
                (!name.is_empty()).then(|| format!("{prefix}{name}/"))
            })
            .collect();
        dirs.dedup();
        dirs
    }

    /// Every winning entry, sorted by path.
    pub fn entries(&self) -> impl Iterator<Item = EntryDescriptor<'_>> + '_ {
        self.index.iter().filter_map(|(_, slot)| self.descriptor(slot))
    }

    /// Open an entry's bytes.
    ///
    /// Stored entries come back as a zero-copy range. Deflated entries are
    /// inflated through the owning archive's cached decoder handle. A failure
    /// here concerns this entry only; the index is never touched.
    pub fn open(&self, entry: EntryDescriptor<'_>) -> Result<ByteSource> {
        let archive = self
            .archives
            .get(entry.id.0)
            .filter(|archive| Arc::ptr_eq(archive, entry.archive))
            .ok_or_else(|| Error::ForeignEntry(entry.path().to_string()))?;
        let record = entry.record;

        if record.is_encrypted() {
            return Err(overpak_zip::Error::Encrypted {
                archive: archive.path().to_path_buf(),
                entry: record.path().to_string(),
            }
            .into());
        }

        match record.compression_method() {
            Ok(CompressionMethod::Stored) => {
                Ok(ByteSource::Range(EntryRange::stored(Arc::clone(archive), record)))
            }
            Ok(CompressionMethod::Deflated) => {
                let handle = self.decoders.get_or_open(entry.id, archive);
                let stream = handle.lock().open_entry(record, self.config.verify_crc)?;
                Ok(ByteSource::Stream(stream))
            }
            Err(method) => Err(overpak_zip::Error::UnsupportedCompressionMethod {
                archive: archive.path().to_path_buf(),
                entry: record.path().to_string(),
                method,
            }
            .into()),
        }
    }

    /// Look up `path` and read the whole entry.
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let entry = self
            .lookup(path)
            .ok_or_else(|| Error::EntryNotFound(path.to_string()))?;
        Ok(self.open(entry)?.read_to_vec()?)
    }

    /// Number of decoder handles currently cached.
    pub fn open_decoders(&self) -> usize {
        self.decoders.len()
    }

    /// Release every cached decoder handle and the set itself.
    ///
    /// Byte sources already handed out stay readable.
    pub fn close(self) {
        let released = self.decoders.clear();
        debug!(
            archives = self.archives.len(),
            released_decoders = released,
            "closed archive set"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    use crate::testutil::{stored_zip_bytes, write_zip, zip_bytes, DEFLATED, STORED};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_archive_set_is_send_sync() {
        assert_send_sync::<ArchiveSet>();
        assert_send_sync::<ByteSource>();
    }

    #[test]
    fn test_single_stored_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(dir.path(), "main.obb", &[("a.txt", b"hello", STORED)]);
        let set = ArchiveSet::load([&path], ArchiveSetConfig::default()).unwrap();

        let entry = set.lookup("a.txt").unwrap();
        assert_eq!(entry.uncompressed_size(), 5);
        assert_eq!(entry.archive_path(), path);

        let source = set.open(entry).unwrap();
        assert!(source.is_zero_copy());
        let range = source.as_range().unwrap();
        assert_eq!(range.len(), 5);
        assert_eq!(range.as_slice(), b"hello");
        assert_eq!(source.read_to_vec().unwrap(), b"hello");
    }

    #[test]
    fn test_overlay_precedence_follows_load_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_zip(dir.path(), "a.obb", &[("P", b"X", STORED), ("only-a", b"a", STORED)]);
        let b = write_zip(dir.path(), "b.obb", &[("P", b"Y", DEFLATED)]);

        let set = ArchiveSet::load([&a, &b], ArchiveSetConfig::default()).unwrap();
        assert_eq!(set.read("P").unwrap(), b"Y");
        assert_eq!(set.lookup("P").unwrap().archive_id(), ArchiveId(1));
        assert_eq!(set.read("only-a").unwrap(), b"a");
        assert_eq!(set.len(), 2);

        let set = ArchiveSet::load([&b, &a], ArchiveSetConfig::default()).unwrap();
        assert_eq!(set.read("P").unwrap(), b"X");
        assert_eq!(set.lookup("P").unwrap().archive_id(), ArchiveId(1));
    }

    #[test]
    fn test_loading_same_archive_twice_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(
            dir.path(),
            "main.obb",
            &[("x", b"1", STORED), ("y/z", b"2", STORED)],
        );

        let once = ArchiveSet::load([&path], ArchiveSetConfig::default()).unwrap();
        let twice = ArchiveSet::load([&path, &path], ArchiveSetConfig::default()).unwrap();

        let snapshot = |set: &ArchiveSet| -> Vec<(String, u64)> {
            set.entries()
                .map(|e| (e.path().to_string(), e.data_offset()))
                .collect()
        };
        assert_eq!(snapshot(&once), snapshot(&twice));
    }

    #[test]
    fn test_list_direct_children_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(
            dir.path(),
            "main.obb",
            &[
                ("assets/a.png", b"a", STORED),
                ("assets/sub/b.png", b"b", STORED),
                ("other.txt", b"o", STORED),
            ],
        );
        let set = ArchiveSet::load([&path], ArchiveSetConfig::default()).unwrap();

        let listed: Vec<_> = set.list("assets/").iter().map(|e| e.path().to_string()).collect();
        assert_eq!(listed, ["assets/a.png"]);

        let root: Vec<_> = set.list("").iter().map(|e| e.path().to_string()).collect();
        assert_eq!(root, ["other.txt"]);

        assert_eq!(set.subdirectories("assets/"), ["assets/sub/"]);
        assert_eq!(set.subdirectories(""), ["assets/"]);
        assert!(set.list("missing/").is_empty());
    }

    #[test]
    fn test_directories_are_inferred() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(dir.path(), "main.obb", &[("assets/sub/b.png", b"b", STORED)]);
        let set = ArchiveSet::load([&path], ArchiveSetConfig::default()).unwrap();

        assert!(set.is_directory("assets"));
        assert!(set.is_directory("assets/sub/"));
        assert!(set.is_directory(""));
        assert!(!set.is_directory("assets/sub/b.png"));
        assert!(!set.is_directory("asset"));
        assert!(set.exists(r"\assets\sub\b.png"));
        assert!(!set.exists("assets"));
    }

    #[test]
    fn test_directory_prefix() {
        assert_eq!(directory_prefix(""), "");
        assert_eq!(directory_prefix("assets"), "assets/");
        assert_eq!(directory_prefix("assets/"), "assets/");
        assert_eq!(directory_prefix(r"\assets\sub"), "assets/sub/");
    }

    #[test]
    fn test_bare_directory_name_lists_its_children() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(
            dir.path(),
            "main.obb",
            &[
                ("assets/a.png", b"a", STORED),
                ("assets/ui/b.png", b"b", STORED),
                ("assets.txt", b"sibling", STORED),
            ],
        );
        let set = ArchiveSet::load([&path], ArchiveSetConfig::default()).unwrap();

        let prefix = directory_prefix("assets");
        let listed: Vec<_> = set.list(&prefix).iter().map(|e| e.path().to_string()).collect();
        assert_eq!(listed, ["assets/a.png"]);
        assert_eq!(set.subdirectories(&prefix), ["assets/ui/"]);
    }

    #[test]
    fn test_deflated_entries_share_one_decoder() {
        let dir = tempfile::tempdir().unwrap();
        let text = b"deflate me, deflate me again ".repeat(20);
        let path = write_zip(
            dir.path(),
            "main.obb",
            &[("one.txt", text.as_slice(), DEFLATED), ("two.txt", text.as_slice(), DEFLATED)],
        );
        let config = ArchiveSetConfig::default().with_crc_verification(true);
        let set = ArchiveSet::load([&path], config).unwrap();
        assert_eq!(set.open_decoders(), 0);

        for name in ["one.txt", "two.txt", "one.txt"] {
            let source = set.open(set.lookup(name).unwrap()).unwrap();
            assert!(!source.is_zero_copy());
            assert_eq!(source.len(), text.len() as u64);
            assert_eq!(source.read_to_vec().unwrap(), text);
        }
        assert_eq!(set.open_decoders(), 1);
    }

    #[test]
    fn test_stream_outlives_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(dir.path(), "main.obb", &[("a.txt", b"still here", DEFLATED)]);
        let set = ArchiveSet::load([&path], ArchiveSetConfig::default()).unwrap();

        let mut reader = set.open(set.lookup("a.txt").unwrap()).unwrap().into_reader();
        set.close();

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "still here");
    }

    /// Rewrite the method field of the first central directory record.
    fn patch_central_method(bytes: &mut [u8], method: u16) {
        let pos = bytes
            .windows(4)
            .position(|w| w == [0x50, 0x4b, 0x01, 0x02])
            .unwrap();
        bytes[pos + 10..pos + 12].copy_from_slice(&method.to_le_bytes());
    }

    #[test]
    fn test_unsupported_method_is_scoped_to_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = zip_bytes(&[
            ("odd.bin", b"not really bzip2", STORED),
            ("ok.txt", b"fine", STORED),
        ]);
        patch_central_method(&mut bytes, 12);
        let path = dir.path().join("main.obb");
        std::fs::write(&path, &bytes).unwrap();

        let set = ArchiveSet::load([&path], ArchiveSetConfig::default()).unwrap();
        let odd = set.lookup("odd.bin").unwrap();
        assert!(matches!(
            set.open(odd),
            Err(Error::Archive(overpak_zip::Error::UnsupportedCompressionMethod { method: 12, .. }))
        ));

        assert_eq!(set.read("ok.txt").unwrap(), b"fine");
        assert_eq!(set.len(), 2);
        assert!(set.lookup("odd.bin").is_some());
    }

    #[test]
    fn test_repeated_name_in_one_archive_serves_last_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.obb");
        let bytes = stored_zip_bytes(&[("dup.txt", b"first"), ("dup.txt", b"second")]);
        std::fs::write(&path, bytes).unwrap();

        let set = ArchiveSet::load([&path], ArchiveSetConfig::default()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.read("dup.txt").unwrap(), b"second");
    }

    #[test]
    fn test_late_patch_shadows_main() {
        let dir = tempfile::tempdir().unwrap();
        let main = write_zip(dir.path(), "main.obb", &[("cfg.json", b"{}", STORED)]);
        let patch = write_zip(dir.path(), "patch.obb", &[("cfg.json", b"{\"v\":2}", STORED)]);

        let mut set = ArchiveSet::load([&main], ArchiveSetConfig::default()).unwrap();
        assert_eq!(set.read("cfg.json").unwrap(), b"{}");

        let report = set.add_archive(&patch).unwrap();
        assert_eq!(report.shadowed, 1);
        assert_eq!(set.archives().len(), 2);
        assert_eq!(set.read("cfg.json").unwrap(), b"{\"v\":2}");
    }

    #[test]
    fn test_failed_archive_leaves_set_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let main = write_zip(dir.path(), "main.obb", &[("a.txt", b"hello", STORED)]);
        let junk = dir.path().join("junk.obb");
        std::fs::write(&junk, vec![0u8; 64]).unwrap();

        let mut set = ArchiveSet::load([&main], ArchiveSetConfig::default()).unwrap();
        assert!(matches!(
            set.add_archive(&junk),
            Err(Error::Archive(overpak_zip::Error::NotAnArchive { .. }))
        ));
        assert_eq!(set.archives().len(), 1);
        assert_eq!(set.read("a.txt").unwrap(), b"hello");
    }

    #[test]
    fn test_foreign_descriptor_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(dir.path(), "main.obb", &[("a.txt", b"hello", STORED)]);
        let first = ArchiveSet::load([&path], ArchiveSetConfig::default()).unwrap();
        let second = ArchiveSet::load([&path], ArchiveSetConfig::default()).unwrap();

        let entry = first.lookup("a.txt").unwrap();
        assert!(matches!(second.open(entry), Err(Error::ForeignEntry(_))));
    }

    #[test]
    fn test_empty_path_list() {
        let paths: [&Path; 0] = [];
        assert!(matches!(
            ArchiveSet::load(paths, ArchiveSetConfig::default()),
            Err(Error::NoArchives)
        ));

        let empty = ArchiveSet::new(ArchiveSetConfig::default());
        assert!(empty.is_empty());
        assert!(matches!(empty.read("nothing"), Err(Error::EntryNotFound(_))));
    }

    #[test]
    fn test_concurrent_reads() {
        let dir = tempfile::tempdir().unwrap();
        let text = b"shared decoder ".repeat(64);
        let path = write_zip(
            dir.path(),
            "main.obb",
            &[("z.txt", text.as_slice(), DEFLATED), ("s.txt", b"stored", STORED)],
        );
        let config = ArchiveSetConfig::default().with_crc_verification(true);
        let set = ArchiveSet::load([&path], config).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    assert_eq!(set.read("z.txt").unwrap(), text);
                    assert_eq!(set.read("s.txt").unwrap(), b"stored");
                });
            }
        });
        assert_eq!(set.open_decoders(), 1);
    }
}

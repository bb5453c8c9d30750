//! Expansion file discovery.
//!
//! Companion archives are named `main.<version>.<package>.<ext>` and
//! `patch.<version>.<package>.<ext>` and live in a package-scoped directory
//! under shared storage. The locator turns that convention into the ordered
//! path list an [`ArchiveSet`](crate::ArchiveSet) is loaded from.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::{Error, Result};

/// Default file extension of expansion archives.
pub const DEFAULT_EXTENSION: &str = "obb";

/// Which of the two expansion slots a file fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ExpansionKind {
    /// Base assets, loaded first.
    Main,
    /// Overrides, loaded after main.
    Patch,
}

impl ExpansionKind {
    /// File name prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Patch => "patch",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "main" => Some(Self::Main),
            "patch" => Some(Self::Patch),
            _ => None,
        }
    }
}

impl fmt::Display for ExpansionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of one expansion file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpansionFile {
    pub kind: ExpansionKind,
    pub version: u32,
    pub package_id: String,
    pub extension: String,
}

impl ExpansionFile {
    pub fn new(kind: ExpansionKind, version: u32, package_id: impl Into<String>) -> Self {
        Self {
            kind,
            version,
            package_id: package_id.into(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// `main.3.com.example.game.obb`
    pub fn file_name(&self) -> String {
        format!("{}.{}.{}.{}", self.kind, self.version, self.package_id, self.extension)
    }

    /// Parse a file name of the form `<kind>.<version>.<package>.<ext>`.
    ///
    /// The package id may itself contain dots; the extension is the last
    /// component.
    pub fn parse(file_name: &str) -> Option<Self> {
        let (kind, rest) = file_name.split_once('.')?;
        let kind = ExpansionKind::from_prefix(kind)?;
        let (version, rest) = rest.split_once('.')?;
        if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let version = version.parse().ok()?;
        let (package_id, extension) = rest.rsplit_once('.')?;
        if package_id.is_empty() || extension.is_empty() {
            return None;
        }

        Some(Self {
            kind,
            version,
            package_id: package_id.to_string(),
            extension: extension.to_string(),
        })
    }
}

impl fmt::Display for ExpansionFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// Finds the expansion files of one package.
///
/// A version of `0` (the default) selects the highest version present on
/// disk; a non-zero version pins an exact file, which must then exist.
///
/// ```no_run
/// use overpak::ExpansionLocator;
///
/// let paths = ExpansionLocator::new("/sdcard/Android/obb", "com.example.game")
///     .main_version(3)
///     .resolve()?;
/// # Ok::<(), overpak::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ExpansionLocator {
    storage_root: PathBuf,
    package_id: String,
    main_version: u32,
    patch_version: u32,
    extension: String,
}

impl ExpansionLocator {
    pub fn new(storage_root: impl Into<PathBuf>, package_id: impl Into<String>) -> Self {
        Self {
            storage_root: storage_root.into(),
            package_id: package_id.into(),
            main_version: 0,
            patch_version: 0,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    #[must_use]
    pub fn main_version(mut self, version: u32) -> Self {
        self.main_version = version;
        self
    }

    #[must_use]
    pub fn patch_version(mut self, version: u32) -> Self {
        self.patch_version = version;
        self
    }

    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    /// `<storage_root>/<package_id>`
    pub fn package_dir(&self) -> PathBuf {
        self.storage_root.join(&self.package_id)
    }

    /// All expansion files of this package present in the package directory,
    /// sorted by kind then version. A missing directory yields nothing.
    pub fn scan(&self) -> Result<Vec<ExpansionFile>> {
        let dir = self.package_dir();
        let read_dir = match fs::read_dir(&dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "package directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }
            let name = dir_entry.file_name();
            let Some(file) = name.to_str().and_then(ExpansionFile::parse) else {
                trace!(name = ?name, "skipping non-expansion file");
                continue;
            };
            if file.package_id == self.package_id && file.extension == self.extension {
                found.push(file);
            }
        }

        found.sort_by_key(|file| (file.kind, file.version));
        Ok(found)
    }

    /// Paths to load, in overlay order: main first, then patch.
    ///
    /// Either slot may be absent when its version is `0`. A pinned version
    /// that does not exist is [`Error::MissingExpansion`].
    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        let dir = self.package_dir();
        let needs_scan = self.main_version == 0 || self.patch_version == 0;
        let present = if needs_scan { self.scan()? } else { Vec::new() };

        let mut paths = Vec::with_capacity(2);
        for (kind, version) in [
            (ExpansionKind::Main, self.main_version),
            (ExpansionKind::Patch, self.patch_version),
        ] {
            if let Some(path) = self.resolve_slot(&dir, &present, kind, version)? {
                paths.push(path);
            }
        }

        debug!(
            package = %self.package_id,
            dir = %dir.display(),
            count = paths.len(),
            "resolved expansion files"
        );
        Ok(paths)
    }

    fn resolve_slot(
        &self,
        dir: &Path,
        present: &[ExpansionFile],
        kind: ExpansionKind,
        version: u32,
    ) -> Result<Option<PathBuf>> {
        if version == 0 {
            let latest = present
                .iter()
                .filter(|file| file.kind == kind)
                .max_by_key(|file| file.version);
            return Ok(latest.map(|file| dir.join(file.file_name())));
        }

        let file = ExpansionFile::new(kind, version, self.package_id.as_str())
            .with_extension(self.extension.as_str());
        let path = dir.join(file.file_name());
        if path.is_file() {
            Ok(Some(path))
        } else {
            Err(Error::MissingExpansion(path))
        }
    }
}

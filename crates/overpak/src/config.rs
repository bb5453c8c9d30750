//! Archive set configuration.

use overpak_zip::ParseOptions;

/// Options applied to every archive in a set.
///
/// ```
/// use overpak::ArchiveSetConfig;
///
/// let config = ArchiveSetConfig::default()
///     .with_strict_local_headers(true)
///     .with_crc_verification(true);
/// assert!(config.parse.strict_local_headers);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ArchiveSetConfig {
    /// Local header validation used while loading.
    pub parse: ParseOptions,
    /// Check CRC-32 and length at the end of every inflated stream.
    pub verify_crc: bool,
}

impl ArchiveSetConfig {
    /// Reject local headers that disagree with the central directory.
    #[must_use]
    pub const fn with_strict_local_headers(mut self, strict: bool) -> Self {
        self.parse = self.parse.with_strict_local_headers(strict);
        self
    }

    /// Verify inflated data against the recorded CRC-32.
    #[must_use]
    pub const fn with_crc_verification(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }
}

//! Parse-time options.

/// Controls how strictly local headers are checked against the central directory.
///
/// Producers are allowed to write different name/extra lengths in the local
/// header than in the central directory, and the local values always decide
/// where entry data starts. The remaining fields (method, CRC, sizes) are only
/// compared when [`strict_local_headers`](Self::strict_local_headers) is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParseOptions {
    /// Reject entries whose local header disagrees with the central directory
    /// on compression method, name, CRC-32 or sizes.
    ///
    /// CRC and sizes are not compared for entries that defer them to a
    /// trailing data descriptor.
    pub strict_local_headers: bool,
}

impl ParseOptions {
    /// Options that reject any local/central header disagreement.
    pub const fn strict() -> Self {
        Self {
            strict_local_headers: true,
        }
    }

    /// Enable or disable strict local header validation.
    #[must_use]
    pub const fn with_strict_local_headers(mut self, strict: bool) -> Self {
        self.strict_local_headers = strict;
        self
    }
}

//! ZIP record layouts.
//!
//! Each header is a `#[repr(C, packed)]` struct read with zerocopy after its
//! 4-byte signature has been checked separately. All integers are
//! little-endian on disk.

mod central_dir;
mod eocd;
mod local;

pub use central_dir::CentralDirectoryHeader;
pub use eocd::EocdRecord;
pub use local::LocalFileHeader;

/// Size of the signature word that precedes every record.
pub const SIGNATURE_SIZE: usize = 4;

/// General purpose flag bit 0: entry is encrypted.
pub const FLAG_ENCRYPTED: u16 = 0x0001;

/// General purpose flag bit 3: sizes and CRC follow the data in a descriptor.
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// Compression methods this reader can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum CompressionMethod {
    /// No compression; entry bytes are the file bytes.
    Stored = 0,
    /// Raw DEFLATE stream.
    Deflated = 8,
}

impl CompressionMethod {
    /// The method code as written in ZIP headers.
    #[inline]
    pub const fn code(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for CompressionMethod {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Stored),
            8 => Ok(Self::Deflated),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stored => f.write_str("stored"),
            Self::Deflated => f.write_str("deflated"),
        }
    }
}

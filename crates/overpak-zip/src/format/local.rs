//! Local file header.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Fixed part of a local file header, after its signature.
///
/// Fields mirror the central directory record from `min_version` through
/// `extra_len`. The header is followed by `name_len` name bytes,
/// `extra_len` extra bytes, and then the entry data itself.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct LocalFileHeader {
    pub min_version: u16,
    pub flags: u16,
    pub method: u16,
    pub dos_datetime: u32,
    /// Zero when the flags defer it to a data descriptor.
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: u32 = 0x04034b50;

    /// Fixed header size, signature included.
    pub const SIZE: usize = 30;

    /// Bytes between the end of the fixed header and the entry data.
    pub fn variable_data_size(&self) -> u64 {
        u64::from(self.name_len) + u64::from(self.extra_len)
    }
}

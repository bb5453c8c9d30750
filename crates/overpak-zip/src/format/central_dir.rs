//! Central directory file header.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Fixed part of one central directory record, after its signature.
///
/// | offset | size | field |
/// |-------:|-----:|-------|
/// | 0  | 4 | signature `PK\x01\x02` (read separately) |
/// | 4  | 2 | version made by |
/// | 6  | 2 | version needed |
/// | 8  | 2 | flags |
/// | 10 | 2 | method |
/// | 12 | 4 | DOS time and date |
/// | 16 | 4 | CRC-32 |
/// | 20 | 4 | compressed size |
/// | 24 | 4 | uncompressed size |
/// | 28 | 2 | name length `n` |
/// | 30 | 2 | extra length `e` |
/// | 32 | 2 | comment length `c` |
/// | 34 | 2 | start disk |
/// | 36 | 2 | internal attributes |
/// | 38 | 4 | external attributes |
/// | 42 | 4 | local header offset |
///
/// Name, extra field and comment follow, in that order.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct CentralDirectoryHeader {
    pub made_by: u16,
    pub min_version: u16,
    pub flags: u16,
    pub method: u16,
    pub dos_datetime: u32,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
    pub comment_len: u16,
    pub start_disk: u16,
    pub internal_attributes: u16,
    pub external_attributes: u32,
    pub local_header_offset: u32,
}

impl CentralDirectoryHeader {
    pub const SIGNATURE: u32 = 0x02014b50;

    /// Fixed record size, signature included.
    pub const SIZE: usize = 46;

    /// Fixed part plus name, extra field and comment.
    pub fn record_size(&self) -> usize {
        Self::SIZE
            + usize::from(self.name_len)
            + usize::from(self.extra_len)
            + usize::from(self.comment_len)
    }
}

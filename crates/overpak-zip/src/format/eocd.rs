//! End of central directory record.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// The record that closes an archive, after its signature.
///
/// Only a comment of `comment_len` bytes may follow it, so it sits between
/// 22 and `22 + 65 535` bytes from the end of the file.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct EocdRecord {
    /// Disk holding this record.
    pub disk: u16,
    /// Disk where the central directory begins.
    pub directory_disk: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub directory_size: u32,
    pub directory_offset: u32,
    pub comment_len: u16,
}

impl EocdRecord {
    pub const SIGNATURE: u32 = 0x06054b50;

    /// Record size, signature included.
    pub const SIZE: usize = 22;

    /// Position of `comment_len` relative to the signature.
    pub const COMMENT_LENGTH_OFFSET: usize = 20;

    /// Longest comment the length field can describe.
    pub const MAX_COMMENT: usize = u16::MAX as usize;

    /// Whether the archive is split over several disks.
    pub fn is_spanned(&self) -> bool {
        self.disk != 0 || self.directory_disk != 0 || self.disk_entries != self.total_entries
    }
}

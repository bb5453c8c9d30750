//! Tail scanner: locates the End-Of-Central-Directory record.
//!
//! The EOCD record is fixed-size but may be followed by a comment of up to
//! 65 535 bytes, so its position is found by searching backwards through the
//! last `22 + 65 535` bytes of the file.

use std::path::Path;

use tracing::debug;

use crate::format::{EocdRecord, LocalFileHeader};
use crate::reader::{u16_at, u32_at};
use crate::{Error, Result};

/// Largest tail window that can contain the EOCD record.
pub const MAX_TAIL_SCAN: usize = EocdRecord::SIZE + EocdRecord::MAX_COMMENT;

/// Low byte of the EOCD signature, used as the memchr needle.
const EOCD_LOW_BYTE: u8 = (EocdRecord::SIGNATURE & 0xFF) as u8;

/// Validate the leading signature and find the EOCD record of a whole archive.
///
/// Returns the absolute offset of the EOCD signature.
pub fn locate_eocd(archive: &Path, data: &[u8]) -> Result<usize> {
    if data.len() < EocdRecord::SIZE {
        return Err(Error::TooSmall {
            archive: archive.to_path_buf(),
            len: data.len() as u64,
        });
    }

    match u32_at(data, 0) {
        Some(LocalFileHeader::SIGNATURE) => {}
        Some(EocdRecord::SIGNATURE) => {
            return Err(Error::CorruptDirectory {
                archive: archive.to_path_buf(),
                reason: "archive contains no entries".to_string(),
            });
        }
        _ => {
            return Err(Error::NotAnArchive {
                archive: archive.to_path_buf(),
                reason: "missing local file header signature at start of file",
            });
        }
    }

    let offset = find_eocd(data).ok_or_else(|| Error::NotAnArchive {
        archive: archive.to_path_buf(),
        reason: "end of central directory record not found",
    })?;

    debug!(
        archive = %archive.display(),
        eocd_offset = offset,
        comment_len = data.len() - offset - EocdRecord::SIZE,
        "located end of central directory"
    );

    Ok(offset)
}

/// Scan the tail of `data` backwards for the EOCD signature.
///
/// Only positions where a complete 22-byte record fits are candidates. The
/// rightmost candidate whose comment length accounts exactly for the rest of
/// the file wins, so a signature embedded in the comment itself is skipped.
/// If no candidate is consistent (trailing bytes after the comment), the
/// rightmost candidate is returned.
pub fn find_eocd(data: &[u8]) -> Option<usize> {
    if data.len() < EocdRecord::SIZE {
        return None;
    }

    let window_start = data.len() - data.len().min(MAX_TAIL_SCAN);
    let mut end = data.len() - EocdRecord::SIZE + 1;
    let mut fallback = None;

    while end > window_start {
        let Some(rel) = memchr::memrchr(EOCD_LOW_BYTE, &data[window_start..end]) else {
            break;
        };
        let pos = window_start + rel;
        end = pos;

        if u32_at(data, pos) != Some(EocdRecord::SIGNATURE) {
            continue;
        }

        let comment_len = u16_at(data, pos + EocdRecord::COMMENT_LENGTH_OFFSET).map(usize::from);
        if comment_len.is_some_and(|len| pos + EocdRecord::SIZE + len == data.len()) {
            return Some(pos);
        }
        fallback.get_or_insert(pos);
    }

    fallback
}

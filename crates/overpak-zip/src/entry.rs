//! Resolved archive entry.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::format::{CompressionMethod, FLAG_DATA_DESCRIPTOR, FLAG_ENCRYPTED};

/// One resource inside an archive, with its data offset resolved.
///
/// Records are produced by [`ArchiveFile::open`](crate::ArchiveFile::open)
/// after the local header of the entry has been read, so
/// [`data_offset`](Self::data_offset) always points at the first byte of the
/// (possibly compressed) entry data and `data_offset + compressed_size` lies
/// within the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EntryRecord {
    /// Normalized forward-slash path used as the lookup key.
    pub(crate) path: String,
    /// Name exactly as stored in the central directory.
    pub(crate) raw_name: String,
    /// Compression method code from the central directory.
    pub(crate) method: u16,
    /// General purpose bit flag.
    pub(crate) flags: u16,
    /// Last modification stamp in DOS format.
    pub(crate) dos_datetime: u32,
    /// CRC-32 of the uncompressed data.
    pub(crate) crc32: u32,
    pub(crate) compressed_size: u64,
    pub(crate) uncompressed_size: u64,
    pub(crate) local_header_offset: u64,
    pub(crate) data_offset: u64,
}

impl EntryRecord {
    /// Normalized path of the entry.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name as written in the central directory, before normalization.
    #[inline]
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// Compression method, or the raw code if it is not one this reader supports.
    #[inline]
    pub fn compression_method(&self) -> Result<CompressionMethod, u16> {
        CompressionMethod::try_from(self.method)
    }

    /// Raw compression method code.
    #[inline]
    pub fn method_code(&self) -> u16 {
        self.method
    }

    /// General purpose bit flag.
    #[inline]
    pub fn flags(&self) -> u16 {
        self.flags
    }

    #[inline]
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Whether CRC and sizes were deferred to a trailing data descriptor.
    #[inline]
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    /// Whether the entry can be handed out as a zero-copy byte range.
    #[inline]
    pub fn is_stored(&self) -> bool {
        self.method == CompressionMethod::Stored.code()
    }

    /// Offset of the local file header.
    #[inline]
    pub fn local_header_offset(&self) -> u64 {
        self.local_header_offset
    }

    /// Offset of the first data byte, computed from the local header.
    #[inline]
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    #[inline]
    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    #[inline]
    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    #[inline]
    pub fn crc32(&self) -> u32 {
        self.crc32
    }

    /// Raw DOS date/time word (time in the low half, date in the high half).
    #[inline]
    pub fn dos_datetime(&self) -> u32 {
        self.dos_datetime
    }

    /// Last modification time, or `None` if the DOS timestamp is invalid.
    pub fn last_modified(&self) -> Option<SystemTime> {
        dos_to_system_time(self.dos_datetime)
    }

    /// Whether this entry is an explicit directory marker.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.path.ends_with('/')
    }

    /// Last path component.
    pub fn file_name(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }

    /// File extension, if any.
    pub fn extension(&self) -> Option<&str> {
        Path::new(self.file_name())
            .extension()
            .and_then(|ext| ext.to_str())
    }
}

/// Normalize an archive name into an index key.
///
/// Backslashes become forward slashes and leading separators are dropped, so
/// `\assets\a.png`, `/assets/a.png` and `assets/a.png` share one key.
pub fn normalize_path(name: &str) -> String {
    name.replace('\\', "/").trim_start_matches('/').to_string()
}

/// Decode a DOS timestamp: time in the low 16 bits (`hhhhh mmmmmm sssss`,
/// seconds halved), date in the high 16 bits (`yyyyyyy mmmm ddddd`, years
/// since 1980). Interpreted as UTC.
fn dos_to_system_time(raw: u32) -> Option<SystemTime> {
    let (date, time) = (raw >> 16, raw & 0xFFFF);
    let year = 1980 + i64::from(date >> 9);
    let month = (date >> 5) & 0x0F;
    let day = date & 0x1F;
    let (hour, minute, second) = (time >> 11, (time >> 5) & 0x3F, (time & 0x1F) * 2);

    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
        return None;
    }
    if hour > 23 || minute > 59 || second > 59 {
        return None;
    }

    let days = u64::try_from(days_since_epoch(year, month, day)).ok()?;
    let secs = days * 86_400 + u64::from(hour * 3600 + minute * 60 + second);
    UNIX_EPOCH.checked_add(Duration::from_secs(secs))
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Days from 1970-01-01 to the given civil date (proleptic Gregorian).
fn days_since_epoch(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let m = i64::from(month);
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

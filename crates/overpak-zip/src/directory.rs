//! Central directory parser.
//!
//! Reads the EOCD record found by the tail scanner and walks the central
//! directory it describes, producing one [`CentralEntry`] per record.

use std::path::Path;

use tracing::debug;

use crate::entry::normalize_path;
use crate::format::{CentralDirectoryHeader, EocdRecord};
use crate::reader::BinaryReader;
use crate::{Error, Result};

/// The fields of the EOCD record that locate the central directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryLocation {
    /// Number of entries in the central directory.
    pub entry_count: u16,
    /// Size of the central directory in bytes.
    pub size: u32,
    /// Offset of the first central directory record.
    pub offset: u32,
}

impl DirectoryLocation {
    /// End of the central directory region.
    #[inline]
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.size)
    }
}

/// A central directory record whose data offset has not been resolved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralEntry {
    pub raw_name: String,
    pub path: String,
    pub flags: u16,
    pub method: u16,
    pub dos_datetime: u32,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub local_header_offset: u64,
}

/// Read and validate the EOCD record at `eocd_offset`.
pub fn read_location(archive: &Path, data: &[u8], eocd_offset: usize) -> Result<DirectoryLocation> {
    let corrupt = |reason: String| Error::CorruptDirectory {
        archive: archive.to_path_buf(),
        reason,
    };

    let mut reader = BinaryReader::new_at(data, eocd_offset);
    let signature = reader.read_u32().map_err(|e| corrupt(e.to_string()))?;
    if signature != EocdRecord::SIGNATURE {
        return Err(corrupt(format!(
            "expected EOCD signature at offset {eocd_offset}, got {signature:#010x}"
        )));
    }
    let eocd: EocdRecord = reader.read_struct().map_err(|e| corrupt(e.to_string()))?;

    if eocd.is_spanned() {
        return Err(corrupt("multi-disk archives are not supported".to_string()));
    }

    let location = DirectoryLocation {
        entry_count: eocd.disk_entries,
        size: eocd.directory_size,
        offset: eocd.directory_offset,
    };

    if location.entry_count == 0 {
        return Err(corrupt("archive contains no entries".to_string()));
    }
    if location.end() > data.len() as u64 {
        return Err(corrupt(format!(
            "directory range {}..{} exceeds file length {}",
            location.offset,
            location.end(),
            data.len()
        )));
    }

    debug!(
        archive = %archive.display(),
        entries = location.entry_count,
        dir_offset = location.offset,
        dir_size = location.size,
        "read end of central directory"
    );

    Ok(location)
}

/// Walk the central directory and return exactly `entry_count` records.
pub fn read_entries(
    archive: &Path,
    data: &[u8],
    location: &DirectoryLocation,
) -> Result<Vec<CentralEntry>> {
    let start = location.offset as usize;
    let region = usize::try_from(location.end())
        .ok()
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| Error::CorruptDirectory {
            archive: archive.to_path_buf(),
            reason: format!(
                "directory range {}..{} exceeds file length {}",
                location.offset,
                location.end(),
                data.len()
            ),
        })?;
    let mut reader = BinaryReader::new(region);
    let mut entries = Vec::with_capacity(location.entry_count as usize);

    for index in 0..location.entry_count {
        let corrupt = |reason: String| Error::CorruptDirectory {
            archive: archive.to_path_buf(),
            reason: format!("record {index}: {reason}"),
        };

        let record_start = reader.position();
        let signature = reader.read_u32().map_err(|e| corrupt(e.to_string()))?;
        if signature != CentralDirectoryHeader::SIGNATURE {
            return Err(corrupt(format!(
                "bad signature {signature:#010x} at offset {}",
                start + record_start
            )));
        }

        let header: CentralDirectoryHeader =
            reader.read_struct().map_err(|e| corrupt(e.to_string()))?;
        let raw_name = reader
            .read_str(usize::from(header.name_len))
            .map_err(|e| corrupt(e.to_string()))?;
        reader
            .skip(usize::from(header.extra_len) + usize::from(header.comment_len))
            .map_err(|e| corrupt(e.to_string()))?;
        debug_assert_eq!(reader.position() - record_start, header.record_size());

        entries.push(CentralEntry {
            raw_name: raw_name.to_string(),
            path: normalize_path(raw_name),
            flags: header.flags,
            method: header.method,
            dos_datetime: header.dos_datetime,
            crc32: header.crc32,
            compressed_size: u64::from(header.compressed_size),
            uncompressed_size: u64::from(header.uncompressed_size),
            local_header_offset: u64::from(header.local_header_offset),
        });
    }

    if !reader.is_empty() {
        debug!(
            archive = %archive.display(),
            unused = reader.remaining(),
            "central directory has bytes past the last record"
        );
    }

    Ok(entries)
}

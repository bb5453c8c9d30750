//! Local header resolver.
//!
//! The central directory does not record where entry data starts. The local
//! header's own name and extra-field lengths decide that, and they may differ
//! from the lengths recorded in the central directory.

use std::path::Path;

use tracing::debug;

use crate::directory::CentralEntry;
use crate::entry::EntryRecord;
use crate::format::{CompressionMethod, LocalFileHeader, FLAG_DATA_DESCRIPTOR};
use crate::options::ParseOptions;
use crate::reader::BinaryReader;
use crate::{Error, Result};

/// Read the local header of `entry` and compute its data offset.
///
/// Fails with [`Error::CorruptEntry`] when the local header is missing, out of
/// bounds, or when the entry data would extend past the end of the archive.
pub fn resolve_entry(
    archive: &Path,
    data: &[u8],
    entry: CentralEntry,
    options: &ParseOptions,
) -> Result<EntryRecord> {
    let corrupt = |reason: String| Error::CorruptEntry {
        archive: archive.to_path_buf(),
        entry: entry.path.clone(),
        reason,
    };

    let file_len = data.len() as u64;
    let header_end = entry.local_header_offset + LocalFileHeader::SIZE as u64;
    if header_end > file_len {
        return Err(corrupt(format!(
            "local header at {} runs past end of archive ({file_len} bytes)",
            entry.local_header_offset
        )));
    }

    let mut reader = BinaryReader::new_at(data, entry.local_header_offset as usize);
    let signature = reader.read_u32().map_err(|e| corrupt(e.to_string()))?;
    if signature != LocalFileHeader::SIGNATURE {
        return Err(corrupt(format!(
            "expected local header signature at {}, got {signature:#010x}",
            entry.local_header_offset
        )));
    }
    let local: LocalFileHeader = reader.read_struct().map_err(|e| corrupt(e.to_string()))?;

    let data_offset = header_end + local.variable_data_size();
    let data_end = data_offset + entry.compressed_size;
    if data_offset >= file_len || data_end > file_len {
        return Err(corrupt(format!(
            "entry data {data_offset}..{data_end} exceeds archive length {file_len}"
        )));
    }

    if entry.method == CompressionMethod::Stored.code()
        && entry.compressed_size != entry.uncompressed_size
    {
        return Err(corrupt(format!(
            "stored entry has compressed size {} but uncompressed size {}",
            entry.compressed_size, entry.uncompressed_size
        )));
    }

    if let Some(mismatch) = header_mismatch(&entry, &local, &mut reader) {
        if options.strict_local_headers {
            return Err(corrupt(format!(
                "local header disagrees with central directory: {mismatch}"
            )));
        }
        debug!(
            archive = %archive.display(),
            entry = %entry.path,
            mismatch,
            "tolerating local header disagreement"
        );
    }

    Ok(EntryRecord {
        path: entry.path,
        raw_name: entry.raw_name,
        method: entry.method,
        flags: entry.flags,
        dos_datetime: entry.dos_datetime,
        crc32: entry.crc32,
        compressed_size: entry.compressed_size,
        uncompressed_size: entry.uncompressed_size,
        local_header_offset: entry.local_header_offset,
        data_offset,
    })
}

/// Describe the first field on which the local header disagrees with the
/// central directory, if any.
fn header_mismatch(
    entry: &CentralEntry,
    local: &LocalFileHeader,
    reader: &mut BinaryReader<'_>,
) -> Option<&'static str> {
    if local.method != entry.method {
        return Some("compression method");
    }
    match reader.read_bytes(usize::from(local.name_len)) {
        Ok(name) if name == entry.raw_name.as_bytes() => {}
        _ => return Some("name"),
    }
    // Entries written with a trailing data descriptor carry zeros here.
    if local.flags & FLAG_DATA_DESCRIPTOR != 0 {
        return None;
    }
    if local.crc32 != entry.crc32 {
        return Some("crc32");
    }
    if u64::from(local.compressed_size) != entry.compressed_size
        || u64::from(local.uncompressed_size) != entry.uncompressed_size
    {
        return Some("sizes");
    }
    None
}

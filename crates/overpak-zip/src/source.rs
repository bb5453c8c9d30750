//! Byte sources handed out for archive entries.
//!
//! Stored entries are exposed as an [`EntryRange`]: the owning archive plus
//! an `(offset, length)` pair, readable either as a zero-copy slice of the
//! memory map or through a bounded [`RangeReader`]. Deflated entries are
//! exposed as an [`InflateStream`].

use std::fs::File;
use std::io::{self, BufRead, Read, Seek, SeekFrom};
use std::sync::Arc;

use flate2::bufread::DeflateDecoder;
use flate2::Crc;

use crate::archive::ArchiveFile;
use crate::entry::EntryRecord;
use crate::Error;

/// Upper bound on the buffer reserved from a recorded uncompressed size.
///
/// The size comes from the central directory and is not trusted; larger
/// entries still read fully, the buffer just grows as data arrives.
const MAX_PREALLOC: u64 = 16 << 20;

/// Where the bytes of an entry come from.
#[derive(Debug)]
pub enum ByteSource {
    /// A `(archive, offset, length)` triple over uncompressed bytes.
    Range(EntryRange),
    /// An inflating stream over compressed bytes.
    Stream(InflateStream),
}

impl ByteSource {
    /// Number of bytes the source yields.
    pub fn len(&self) -> u64 {
        match self {
            Self::Range(range) => range.len(),
            Self::Stream(stream) => stream.uncompressed_size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the bytes can be handed out without copying or decoding.
    #[inline]
    pub fn is_zero_copy(&self) -> bool {
        matches!(self, Self::Range(_))
    }

    /// The raw triple, for stored entries.
    pub fn as_range(&self) -> Option<&EntryRange> {
        match self {
            Self::Range(range) => Some(range),
            Self::Stream(_) => None,
        }
    }

    /// Turn the source into a plain reader.
    pub fn into_reader(self) -> EntryReader {
        match self {
            Self::Range(range) => EntryReader::Range(range.reader()),
            Self::Stream(stream) => EntryReader::Stream(stream),
        }
    }

    /// Read the whole entry into memory.
    pub fn read_to_vec(self) -> io::Result<Vec<u8>> {
        match self {
            Self::Range(range) => Ok(range.as_slice().to_vec()),
            Self::Stream(mut stream) => {
                let capacity = stream.uncompressed_size().min(MAX_PREALLOC);
                let mut out = Vec::with_capacity(capacity as usize);
                stream.read_to_end(&mut out)?;
                Ok(out)
            }
        }
    }
}

/// A byte range inside an archive.
///
/// Holds the archive alive, so the range stays readable after the archive
/// set that produced it has been closed.
#[derive(Debug, Clone)]
pub struct EntryRange {
    archive: Arc<ArchiveFile>,
    offset: u64,
    len: u64,
}

impl EntryRange {
    /// The data range of a stored entry.
    pub fn stored(archive: Arc<ArchiveFile>, entry: &EntryRecord) -> Self {
        Self::new(archive, entry.data_offset(), entry.uncompressed_size())
    }

    /// The compressed data range of any entry.
    pub fn compressed(archive: Arc<ArchiveFile>, entry: &EntryRecord) -> Self {
        Self::new(archive, entry.data_offset(), entry.compressed_size())
    }

    pub(crate) fn new(archive: Arc<ArchiveFile>, offset: u64, len: u64) -> Self {
        debug_assert!(offset + len <= archive.len());
        Self {
            archive,
            offset,
            len,
        }
    }

    #[inline]
    pub fn archive(&self) -> &Arc<ArchiveFile> {
        &self.archive
    }

    /// The archive's file handle; pair it with [`offset`](Self::offset) and
    /// [`len`](Self::len) for positioned reads.
    #[inline]
    pub fn file(&self) -> &File {
        self.archive.file()
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Zero-copy view of the range.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        let start = self.offset as usize;
        &self.archive.data()[start..start + self.len as usize]
    }

    /// A seekable reader bounded to this range.
    pub fn reader(&self) -> RangeReader {
        RangeReader {
            range: self.clone(),
            pos: 0,
        }
    }
}

/// `Read + Seek` over an [`EntryRange`].
#[derive(Debug, Clone)]
pub struct RangeReader {
    range: EntryRange,
    pos: u64,
}

impl RangeReader {
    #[inline]
    pub fn range(&self) -> &EntryRange {
        &self.range
    }

    fn remaining_slice(&self) -> &[u8] {
        let slice = self.range.as_slice();
        &slice[(self.pos.min(self.range.len) as usize)..]
    }
}

impl Read for RangeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining_slice();
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl BufRead for RangeReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(self.remaining_slice())
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt as u64).min(self.range.len);
    }
}

impl Seek for RangeReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.range.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of entry")
        })?;
        self.pos = target;
        Ok(target)
    }
}

/// Inflating reader over the compressed bytes of a deflated entry.
#[derive(Debug)]
pub struct InflateStream {
    path: String,
    decoder: DeflateDecoder<RangeReader>,
    expected_crc: u32,
    expected_len: u64,
    /// Running checksum; `None` when verification is off.
    crc: Option<Crc>,
    verified: bool,
}

impl InflateStream {
    /// Inflate `compressed`, which must hold the raw deflate data of `entry`.
    pub fn new(compressed: EntryRange, entry: &EntryRecord, verify_crc: bool) -> Self {
        Self {
            path: entry.path().to_string(),
            decoder: DeflateDecoder::new(compressed.reader()),
            expected_crc: entry.crc32(),
            expected_len: entry.uncompressed_size(),
            crc: verify_crc.then(Crc::new),
            verified: false,
        }
    }

    /// Path of the entry being inflated.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Length of the inflated data as recorded in the central directory.
    #[inline]
    pub fn uncompressed_size(&self) -> u64 {
        self.expected_len
    }

    /// The compressed range this stream reads from.
    #[inline]
    pub fn compressed_range(&self) -> &EntryRange {
        self.decoder.get_ref().range()
    }

    fn verify(&mut self) -> io::Result<()> {
        let Some(crc) = &self.crc else {
            return Ok(());
        };
        self.verified = true;

        let actual_len = u64::from(crc.amount());
        if crc.sum() != self.expected_crc || actual_len != self.expected_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                Error::CrcMismatch {
                    entry: self.path.clone(),
                    expected: self.expected_crc,
                    actual: crc.sum(),
                    expected_len: self.expected_len,
                    actual_len,
                },
            ));
        }
        Ok(())
    }
}

impl Read for InflateStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.decoder.read(buf)?;
        if let Some(crc) = &mut self.crc {
            crc.update(&buf[..n]);
        }
        if n == 0 && !buf.is_empty() && !self.verified {
            self.verify()?;
        }
        Ok(n)
    }
}

/// Plain reader over either kind of [`ByteSource`].
#[derive(Debug)]
pub enum EntryReader {
    Range(RangeReader),
    Stream(InflateStream),
}

impl Read for EntryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Range(reader) => reader.read(buf),
            Self::Stream(stream) => stream.read(buf),
        }
    }
}

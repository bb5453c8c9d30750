//! Hand-assembled archives for tests.
//!
//! The builder writes every header field explicitly so tests can corrupt
//! individual bytes at known offsets.

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};
use tempfile::NamedTempFile;

use crate::format::{LocalFileHeader, FLAG_DATA_DESCRIPTOR};

const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x08074b50;

struct Member {
    name: String,
    method: u16,
    flags: u16,
    payload: Vec<u8>,
    crc32: u32,
    uncompressed_len: u32,
    local_extra: Vec<u8>,
    central_extra: Vec<u8>,
    comment: Vec<u8>,
}

/// Offsets of the interesting records in a built archive.
pub struct BuiltArchive {
    pub bytes: Vec<u8>,
    pub local_offsets: Vec<usize>,
    pub central_offsets: Vec<usize>,
    pub eocd_offset: usize,
}

impl BuiltArchive {
    /// Write the archive to a temporary file.
    pub fn to_temp_file(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp archive");
        file.write_all(&self.bytes).expect("write temp archive");
        file.flush().expect("flush temp archive");
        file
    }
}

#[derive(Default)]
pub struct ArchiveBuilder {
    members: Vec<Member>,
    comment: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.member(name, 0, data.to_vec(), data)
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).expect("deflate test data");
        let compressed = encoder.finish().expect("finish deflate");
        self.member(name, 8, compressed, data)
    }

    /// Add an entry with an arbitrary method code and raw payload.
    pub fn raw(self, name: &str, method: u16, payload: &[u8]) -> Self {
        self.member(name, method, payload.to_vec(), payload)
    }

    fn member(mut self, name: &str, method: u16, payload: Vec<u8>, original: &[u8]) -> Self {
        let mut crc = Crc::new();
        crc.update(original);
        self.members.push(Member {
            name: name.to_string(),
            method,
            flags: 0,
            payload,
            crc32: crc.sum(),
            uncompressed_len: original.len() as u32,
            local_extra: Vec::new(),
            central_extra: Vec::new(),
            comment: Vec::new(),
        });
        self
    }

    fn last(&mut self) -> &mut Member {
        self.members.last_mut().expect("no member to modify")
    }

    pub fn local_extra(mut self, extra: &[u8]) -> Self {
        self.last().local_extra = extra.to_vec();
        self
    }

    pub fn central_extra(mut self, extra: &[u8]) -> Self {
        self.last().central_extra = extra.to_vec();
        self
    }

    pub fn entry_comment(mut self, comment: &[u8]) -> Self {
        self.last().comment = comment.to_vec();
        self
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.last().flags |= flags;
        self
    }

    pub fn with_data_descriptor(self) -> Self {
        self.with_flags(FLAG_DATA_DESCRIPTOR)
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn build(self) -> BuiltArchive {
        let mut out = Vec::new();
        let mut local_offsets = Vec::new();

        for m in &self.members {
            local_offsets.push(out.len());
            let deferred = m.flags & FLAG_DATA_DESCRIPTOR != 0;
            let (crc, csize, usize_) = if deferred {
                (0, 0, 0)
            } else {
                (m.crc32, m.payload.len() as u32, m.uncompressed_len)
            };

            put_u32(&mut out, LocalFileHeader::SIGNATURE);
            put_u16(&mut out, 20);
            put_u16(&mut out, m.flags);
            put_u16(&mut out, m.method);
            put_u32(&mut out, 0x5421_6000);
            put_u32(&mut out, crc);
            put_u32(&mut out, csize);
            put_u32(&mut out, usize_);
            put_u16(&mut out, m.name.len() as u16);
            put_u16(&mut out, m.local_extra.len() as u16);
            out.extend_from_slice(m.name.as_bytes());
            out.extend_from_slice(&m.local_extra);
            out.extend_from_slice(&m.payload);

            if deferred {
                put_u32(&mut out, DATA_DESCRIPTOR_SIGNATURE);
                put_u32(&mut out, m.crc32);
                put_u32(&mut out, m.payload.len() as u32);
                put_u32(&mut out, m.uncompressed_len);
            }
        }

        let dir_offset = out.len();
        let mut central_offsets = Vec::new();
        for (m, local) in self.members.iter().zip(&local_offsets) {
            central_offsets.push(out.len());
            put_u32(&mut out, 0x02014b50);
            put_u16(&mut out, 20);
            put_u16(&mut out, 20);
            put_u16(&mut out, m.flags);
            put_u16(&mut out, m.method);
            put_u32(&mut out, 0x5421_6000);
            put_u32(&mut out, m.crc32);
            put_u32(&mut out, m.payload.len() as u32);
            put_u32(&mut out, m.uncompressed_len);
            put_u16(&mut out, m.name.len() as u16);
            put_u16(&mut out, m.central_extra.len() as u16);
            put_u16(&mut out, m.comment.len() as u16);
            put_u16(&mut out, 0);
            put_u16(&mut out, 0);
            put_u32(&mut out, 0);
            put_u32(&mut out, *local as u32);
            out.extend_from_slice(m.name.as_bytes());
            out.extend_from_slice(&m.central_extra);
            out.extend_from_slice(&m.comment);
        }
        let dir_size = out.len() - dir_offset;

        let eocd_offset = out.len();
        let count = self.members.len() as u16;
        put_u32(&mut out, 0x06054b50);
        put_u16(&mut out, 0);
        put_u16(&mut out, 0);
        put_u16(&mut out, count);
        put_u16(&mut out, count);
        put_u32(&mut out, dir_size as u32);
        put_u32(&mut out, dir_offset as u32);
        put_u16(&mut out, self.comment.len() as u16);
        out.extend_from_slice(&self.comment);

        BuiltArchive {
            bytes: out,
            local_offsets,
            central_offsets,
            eocd_offset,
        }
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

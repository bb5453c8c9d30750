//! Bounds-checked little-endian cursor over a byte slice.
//!
//! [`BinaryReader`] never panics on short input: every read reports how many
//! bytes were needed and how many were left, so header parsers can turn a
//! truncated record into a descriptive archive error.

use thiserror::Error;
use zerocopy::FromBytes;

/// Failure while decoding from a [`BinaryReader`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// End of buffer reached while reading.
    #[error(
        "unexpected end of buffer at offset {offset}: needed {needed} bytes but only \
         {available} available"
    )]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A length-prefixed string was not valid UTF-8.
    #[error("invalid UTF-8 at offset {offset}: {source}")]
    Utf8 {
        offset: usize,
        #[source]
        source: std::str::Utf8Error,
    },
}

/// A cursor that reads little-endian values from a borrowed slice.
///
/// # Example
///
/// ```
/// use overpak_zip::BinaryReader;
///
/// let data = [0x50, 0x4b, 0x03, 0x04, 0x14, 0x00];
/// let mut reader = BinaryReader::new(&data);
///
/// assert_eq!(reader.read_u32().unwrap(), 0x04034b50);
/// assert_eq!(reader.read_u16().unwrap(), 20);
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self::new_at(data, 0)
    }

    /// Cursor positioned at `position`; reads fail if it lies past the end.
    #[inline]
    pub const fn new_at(data: &'a [u8], position: usize) -> Self {
        Self { data, position }
    }

    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    #[inline]
    pub fn skip(&mut self, count: usize) -> Result<(), ReadError> {
        self.read_bytes(count).map(drop)
    }

    /// Borrow the next `count` bytes. A failed read does not move the cursor.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], ReadError> {
        let available = self.remaining();
        if count > available {
            return Err(ReadError::UnexpectedEof {
                offset: self.position,
                needed: count,
                available,
            });
        }
        let start = self.position;
        self.position += count;
        Ok(&self.data[start..self.position])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ReadError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16, ReadError> {
        self.read_array().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32, ReadError> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Borrow `len` bytes as strict UTF-8.
    pub fn read_str(&mut self, len: usize) -> Result<&'a str, ReadError> {
        let offset = self.position;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|source| ReadError::Utf8 { offset, source })
    }

    /// Copy the next `size_of::<T>()` bytes out as a header struct.
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T, ReadError> {
        let offset = self.position;
        let needed = std::mem::size_of::<T>();
        let bytes = self.read_bytes(needed)?;
        T::read_from_bytes(bytes).map_err(|_| ReadError::UnexpectedEof {
            offset,
            needed,
            available: bytes.len(),
        })
    }
}

/// Read a little-endian u32 at `offset` without a cursor.
#[inline]
pub(crate) fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    bytes.try_into().ok().map(u32::from_le_bytes)
}

/// Read a little-endian u16 at `offset` without a cursor.
#[inline]
pub(crate) fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    bytes.try_into().ok().map(u16::from_le_bytes)
}

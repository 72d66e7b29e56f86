use bytes::{BufMut, BytesMut};

use crate::error::{Result, WireError};

/// Append a single byte.
pub fn put_byte(dst: &mut BytesMut, value: u8) {
    dst.put_u8(value);
}

/// Append a 64-bit unsigned integer, little-endian.
pub fn put_u64(dst: &mut BytesMut, value: u64) {
    dst.put_u64_le(value);
}

/// Append a vector of 64-bit unsigned integers, little-endian, back to back.
///
/// The element count is not written here; the protocol carries it in a
/// preceding 64-bit field written by the caller.
pub fn put_u64_slice(dst: &mut BytesMut, values: &[u64]) {
    dst.reserve(values.len() * 8);
    for &value in values {
        dst.put_u64_le(value);
    }
}

/// Append a string as raw UTF-8 bytes.
///
/// No terminator and no inline length; the byte length travels in a
/// preceding 64-bit field written by the caller.
pub fn put_str(dst: &mut BytesMut, value: &str) {
    dst.put_slice(value.as_bytes());
}

/// Cursor-style decoder over a byte slice.
///
/// Every read validates the remaining length before slicing, so a declared
/// count can never cause allocation beyond what the buffer actually holds.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, needed: u64) -> Result<&'a [u8]> {
        let available = self.remaining();
        if needed > available as u64 {
            return Err(WireError::Underrun { needed, available });
        }
        let start = self.pos;
        self.pos += needed as usize;
        Ok(&self.buf[start..self.pos])
    }

    /// Read a single byte.
    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a 64-bit unsigned integer, little-endian.
    pub fn u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("slice is 8 bytes")))
    }

    /// Read `len` 64-bit unsigned integers.
    pub fn u64_vec(&mut self, len: u64) -> Result<Vec<u64>> {
        let needed = len.checked_mul(8).ok_or(WireError::Underrun {
            needed: u64::MAX,
            available: self.remaining(),
        })?;
        let bytes = self.take(needed)?;
        Ok(bytes
            .chunks_exact(8)
            .map(|chunk| u64::from_le_bytes(chunk.try_into().expect("chunk is 8 bytes")))
            .collect())
    }

    /// Read `len` 32-bit floats, little-endian bit layout.
    pub fn f32_vec(&mut self, len: u64) -> Result<Vec<f32>> {
        let needed = len.checked_mul(4).ok_or(WireError::Underrun {
            needed: u64::MAX,
            available: self.remaining(),
        })?;
        let bytes = self.take(needed)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(chunk.try_into().expect("chunk is 4 bytes")))
            .collect())
    }

    /// Read `len` raw bytes as a UTF-8 string.
    pub fn str_utf8(&mut self, len: u64) -> Result<String> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8)
    }

    /// Assert the buffer was consumed exactly.
    ///
    /// Leftover bytes mean the two sides disagree about the layout, which is
    /// a protocol desynchronization, not something to ignore.
    pub fn finish(self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            left => Err(WireError::TrailingBytes(left)),
        }
    }
}

//! Sequential reader over an in-memory byte buffer.
//!
//! Every read is all-or-nothing: when fewer bytes remain than the read needs,
//! the cursor stays where it was and returns `TruncatedInput`.

use ntd_core::{Error, Result};

/// Position-tracking reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total buffer length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True once every byte has been consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Fail unless at least `n` bytes remain.
    pub fn require(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            Err(Error::truncated(self.pos, n, self.remaining()))
        } else {
            Ok(())
        }
    }

    /// Jump to an absolute offset. Seeking to the end is allowed, past it is not.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(Error::truncated(
                self.data.len(),
                offset - self.data.len(),
                0,
            ));
        }
        self.pos = offset;
        Ok(())
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.require(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    /// Read one raw byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read an `n`-byte big-endian unsigned integer, `n` in 1..=8.
    pub fn read_be_u64(&mut self, n: usize) -> Result<u64> {
        debug_assert!((1..=8).contains(&n), "big-endian width {n} out of range");
        Ok(self
            .read_bytes(n)?
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// Read an `n`-byte big-endian two's complement integer, `n` in 1..=8.
    pub fn read_be_i64(&mut self, n: usize) -> Result<i64> {
        let raw = self.read_be_u64(n)?;
        let shift = 64 - 8 * n as u32;
        // Sign-extend from the top bit of the n-byte value.
        Ok(((raw << shift) as i64) >> shift)
    }

    /// Read a little-endian `u32`.
    pub fn read_le_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian `u64`.
    pub fn read_le_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian `i64`.
    pub fn read_le_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian IEEE 754 double.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }
}

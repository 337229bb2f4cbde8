//! Bounds-checked little-endian cursor over a byte slice.

use crate::error::{DecodeError, DecodeResult};

/// Sequential reader over tile bytes.
///
/// Every read checks the remaining length and reports
/// [`DecodeError::UnexpectedEof`] instead of panicking.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current cursor position.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left after the cursor.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Take the next `len` bytes.
    pub fn take(&mut self, len: usize) -> DecodeResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(DecodeError::UnexpectedEof {
                offset: self.offset,
                needed: len,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    /// Advance the cursor by `len` bytes.
    pub fn skip(&mut self, len: usize) -> DecodeResult<()> {
        self.take(len).map(|_| ())
    }

    /// Advance the cursor to the next multiple of `alignment`.
    ///
    /// Alignment is relative to the start of the buffer. Running out of
    /// bytes while aligning is an error.
    pub fn align(&mut self, alignment: usize) -> DecodeResult<()> {
        let misalignment = self.offset % alignment;
        if misalignment != 0 {
            self.skip(alignment - misalignment)?;
        }
        Ok(())
    }

    fn array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        self.array().map(u32::from_le_bytes)
    }

    /// Read a `u32` in the given byte order.
    pub fn read_u32_endian(&mut self, little_endian: bool) -> DecodeResult<u32> {
        let bytes = self.array()?;
        Ok(if little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    }

    pub fn read_f32(&mut self) -> DecodeResult<f32> {
        self.array().map(f32::from_le_bytes)
    }

    pub fn read_f64(&mut self) -> DecodeResult<f64> {
        self.array().map(f64::from_le_bytes)
    }

    /// Read three consecutive `f64` values as a vector.
    pub fn read_dvec3(&mut self) -> DecodeResult<glam::DVec3> {
        Ok(glam::DVec3::new(
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
        ))
    }

    /// Read `count` little-endian `u16` values.
    pub fn read_u16_vec(&mut self, count: usize) -> DecodeResult<Vec<u16>> {
        let bytes = self.take(count.saturating_mul(2))?;
        Ok(bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect())
    }

    /// Read `count` indices of the given byte width (2 or 4) widened to `u32`.
    pub fn read_index_vec(&mut self, count: usize, width: usize) -> DecodeResult<Vec<u32>> {
        let bytes = self.take(count.saturating_mul(width))?;
        Ok(if width == 4 {
            bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        } else {
            bytes
                .chunks_exact(2)
                .map(|c| u32::from(u16::from_le_bytes([c[0], c[1]])))
                .collect()
        })
    }
}

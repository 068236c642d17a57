//! Bounds-checked cursor over an in-memory `.sav` file.
//!
//! System files record their byte order in the header, so the cursor carries
//! the endianness at runtime rather than in the type.

use super::{SavError, SavResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            pos: 0,
            endian,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Borrow the next `len` bytes and advance past them
    pub fn take(&mut self, len: usize) -> SavResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(SavError::Truncated {
                offset: self.pos,
                expected: len,
                available: self.remaining(),
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> SavResult<()> {
        self.take(len).map(|_| ())
    }

    pub fn read_array<const N: usize>(&mut self) -> SavResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> SavResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i32(&mut self) -> SavResult<i32> {
        let bytes = self.read_array::<4>()?;
        Ok(match self.endian {
            Endian::Little => i32::from_le_bytes(bytes),
            Endian::Big => i32::from_be_bytes(bytes),
        })
    }

    pub fn read_f64(&mut self) -> SavResult<f64> {
        let bytes = self.read_array::<8>()?;
        Ok(decode_f64(bytes, self.endian))
    }

    /// Read an i32 that must be a non-negative count or length
    pub fn read_count(&mut self, what: &str) -> SavResult<usize> {
        let offset = self.pos;
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| SavError::InvalidDictionary {
            offset,
            reason: format!("negative {}: {}", what, value),
        })
    }
}

/// Interpret 8 raw bytes as an f64 in the file's byte order
pub fn decode_f64(bytes: [u8; 8], endian: Endian) -> f64 {
    match endian {
        Endian::Little => f64::from_le_bytes(bytes),
        Endian::Big => f64::from_be_bytes(bytes),
    }
}

/// Encode an f64 back into the file's byte order
pub fn encode_f64(value: f64, endian: Endian) -> [u8; 8] {
    match endian {
        Endian::Little => value.to_le_bytes(),
        Endian::Big => value.to_be_bytes(),
    }
}

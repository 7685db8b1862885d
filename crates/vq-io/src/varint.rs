//! Variable-length integers.
//!
//! Seven bits per byte, most significant group first; the last byte of a
//! value is the one with its top bit set. Zero is the single byte `0x80`.

use crate::error::{Error, Result};

pub fn put_varint(out: &mut Vec<u8>, value: u64) {
    let mut n = 7;
    while n < 64 && (value >> n) > 0 {
        n += 7;
    }
    while n > 7 {
        n -= 7;
        out.push(((value >> n) & 0x7F) as u8);
    }
    out.push((value & 0x7F) as u8 | 0x80);
}

/// A `(size, offset)` pair; the offset is left out when the size is zero.
pub fn put_pair(out: &mut Vec<u8>, size: u64, offset: u64) {
    put_varint(out, size);
    if size > 0 {
        put_varint(out, offset);
    }
}

/// Read position within a byte slice.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        match self.pos.checked_add(n) {
            Some(end) if end <= self.data.len() => {
                self.pos = end;
                Ok(())
            }
            _ => Err(Error::format(format!("skip of {} bytes at {} runs past the end", n, self.pos))),
        }
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let from = self.pos;
        self.skip(n)?;
        Ok(&self.data[from..self.pos])
    }

    pub fn varint(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        loop {
            let b = self
                .peek()
                .ok_or_else(|| Error::format(format!("truncated varint at {}", self.pos)))?;
            self.pos += 1;
            if value >> 57 != 0 {
                return Err(Error::format(format!("varint overflow at {}", self.pos)));
            }
            value = (value << 7) | u64::from(b & 0x7F);
            if b & 0x80 != 0 {
                return Ok(value);
            }
        }
    }

    pub fn usize(&mut self) -> Result<usize> {
        let v = self.varint()?;
        usize::try_from(v).map_err(|_| Error::format(format!("value {} out of range", v)))
    }

    /// A `(size, offset)` pair as written by `put_pair`.
    pub fn pair(&mut self) -> Result<(usize, usize)> {
        let size = self.usize()?;
        let offset = if size > 0 { self.usize()? } else { 0 };
        Ok((size, offset))
    }

    /// Skip a pair, including inline data (a pair with offset zero is
    /// followed by its bytes). Returns the size.
    pub fn skip_pair(&mut self) -> Result<usize> {
        let (size, offset) = self.pair()?;
        if size > 0 && offset == 0 {
            self.skip(size)?;
        }
        Ok(size)
    }
}

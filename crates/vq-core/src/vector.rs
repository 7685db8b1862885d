//! Typed vectors: packed fixed-width getters and string/bytes vectors.

use once_cell::unsync::OnceCell;

use crate::buffer::Buffer;
use crate::error::ErrorCode;
use crate::item::{Item, ItemType};

/// Decoder for one fixed-width element layout.
///
/// Chosen once when a column is built, so row access never branches on the
/// element width. Multi-byte layouts decode little-endian; the `*Rev`
/// variants decode data written on a big-endian host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Getter {
    Zero,
    Bit1,
    Bit2,
    Bit4,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    I16Rev,
    I32Rev,
    I64Rev,
    F32Rev,
    F64Rev,
}

/// Bit widths for tiny columns, indexed by `[rows][bytes]`; -1 marks a
/// combination no writer produces.
const TINY_WIDTHS: [[i8; 7]; 8] = [
    [0, -1, -1, -1, -1, -1, -1],
    [0, 8, 16, 1, 32, 2, 4],
    [0, 4, 8, 1, 16, 2, -1],
    [0, 2, 4, 8, 1, -1, 16],
    [0, 2, 4, -1, 8, 1, -1],
    [0, 1, 2, 4, -1, 8, -1],
    [0, 1, 2, 4, -1, -1, 8],
    [0, 1, 2, -1, 4, -1, -1],
];

impl Getter {
    /// Integer getter for a bit width (PickIntGetter).
    pub fn for_bits(bits: usize) -> Option<Getter> {
        Some(match bits {
            0 => Getter::Zero,
            1 => Getter::Bit1,
            2 => Getter::Bit2,
            4 => Getter::Bit4,
            8 => Getter::I8,
            16 => Getter::I16,
            32 => Getter::I32,
            64 => Getter::I64,
            _ => return None,
        })
    }

    /// Getter for `rows` elements packed into `bytes` bytes.
    pub fn fixed(bytes: usize, rows: usize, real: bool, flip: bool) -> Option<Getter> {
        let bits = if rows < 8 && bytes < 7 {
            let w = TINY_WIDTHS[rows][bytes];
            if w < 0 {
                return None;
            }
            w as usize
        } else if rows == 0 {
            return None;
        } else {
            (bytes << 3) / rows
        };

        Some(match (bits, real, flip) {
            (16, _, false) => Getter::I16,
            (16, _, true) => Getter::I16Rev,
            (32, true, false) => Getter::F32,
            (32, true, true) => Getter::F32Rev,
            (32, false, false) => Getter::I32,
            (32, false, true) => Getter::I32Rev,
            (64, true, false) => Getter::F64,
            (64, true, true) => Getter::F64Rev,
            (64, false, false) => Getter::I64,
            (64, false, true) => Getter::I64Rev,
            _ => return Getter::for_bits(bits),
        })
    }

    pub fn item_type(self) -> ItemType {
        match self {
            Getter::I64 | Getter::I64Rev => ItemType::Wide,
            Getter::F32 | Getter::F32Rev => ItemType::Float,
            Getter::F64 | Getter::F64Rev => ItemType::Double,
            _ => ItemType::Int,
        }
    }

    /// Decode element `row` from `data`.
    pub fn fetch(self, data: &[u8], row: usize) -> Item {
        match self.try_fetch(data, row) {
            Some(item) => item,
            None => Item::Error(ErrorCode::RowOutOfRange),
        }
    }

    fn try_fetch(self, data: &[u8], row: usize) -> Option<Item> {
        Some(match self {
            Getter::Zero => Item::Int(0),
            Getter::Bit1 => Item::Int(((data.get(row >> 3)? >> (row & 7)) & 1) as i32),
            Getter::Bit2 => Item::Int(((data.get(row >> 2)? >> (2 * (row & 3))) & 3) as i32),
            Getter::Bit4 => Item::Int(((data.get(row >> 1)? >> (4 * (row & 1))) & 15) as i32),
            Getter::I8 => Item::Int(*data.get(row)? as i8 as i32),
            Getter::I16 => Item::Int(i16::from_le_bytes(chunk(data, row)?) as i32),
            Getter::I16Rev => Item::Int(i16::from_be_bytes(chunk(data, row)?) as i32),
            Getter::I32 => Item::Int(i32::from_le_bytes(chunk(data, row)?)),
            Getter::I32Rev => Item::Int(i32::from_be_bytes(chunk(data, row)?)),
            Getter::I64 => Item::Wide(i64::from_le_bytes(chunk(data, row)?)),
            Getter::I64Rev => Item::Wide(i64::from_be_bytes(chunk(data, row)?)),
            Getter::F32 => Item::Float(f32::from_le_bytes(chunk(data, row)?)),
            Getter::F32Rev => Item::Float(f32::from_be_bytes(chunk(data, row)?)),
            Getter::F64 => Item::Double(f64::from_le_bytes(chunk(data, row)?)),
            Getter::F64Rev => Item::Double(f64::from_be_bytes(chunk(data, row)?)),
        })
    }
}

fn chunk<const N: usize>(data: &[u8], row: usize) -> Option<[u8; N]> {
    let at = row.checked_mul(N)?;
    data.get(at..at + N)?.try_into().ok()
}

/// Finished string or bytes vector: one packed data area plus offsets.
///
/// Strings and bytes share the layout; strings are decoded as UTF-8 on
/// access (lossily, so foreign data never fails a read).
#[derive(Debug, Default)]
pub struct StrVec {
    offsets: Vec<usize>,
    data: Vec<u8>,
    lookup: OnceCell<Vec<i32>>,
}

impl StrVec {
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes(&self, row: usize) -> &[u8] {
        match (self.offsets.get(row), self.offsets.get(row + 1)) {
            (Some(&from), Some(&to)) => &self.data[from..to],
            _ => &[],
        }
    }

    pub fn text(&self, row: usize) -> String {
        String::from_utf8_lossy(self.bytes(row)).into_owned()
    }

    pub fn from_strs<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut b = StrVecBuilder::new();
        for s in items {
            b.push(s.as_ref());
        }
        b.finish()
    }

    /// Probe table for name lookups, built on first use.
    pub(crate) fn lookup_table(&self, build: impl FnOnce() -> Vec<i32>) -> &[i32] {
        self.lookup.get_or_init(build)
    }
}

/// Append phase of a string vector: content bytes plus per-item sizes.
#[derive(Debug, Default)]
pub struct StrVecBuilder {
    content: Buffer,
    sizes: Buffer,
    count: usize,
}

impl StrVecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: &[u8]) {
        self.content.push_bytes(item);
        self.sizes.push_i32(item.len() as i32);
        self.count += 1;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn finish(self) -> StrVec {
        let mut offsets = Vec::with_capacity(self.count + 1);
        let mut fill = 0usize;
        offsets.push(0);
        for n in self.sizes.to_ints() {
            fill += n as usize;
            offsets.push(fill);
        }
        StrVec {
            offsets,
            data: self.content.to_vec(),
            lookup: OnceCell::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiny_widths_follow_the_table() {
        assert_eq!(Getter::fixed(1, 1, false, false), Some(Getter::I8));
        assert_eq!(Getter::fixed(1, 2, false, false), Some(Getter::Bit4));
        assert_eq!(Getter::fixed(1, 3, false, false), Some(Getter::Bit2));
        assert_eq!(Getter::fixed(4, 1, true, false), Some(Getter::F32));
        assert_eq!(Getter::fixed(8, 1, true, true), Some(Getter::F64Rev));
        assert_eq!(Getter::fixed(2, 9, false, false), Some(Getter::Bit1));
        assert_eq!(Getter::fixed(0, 0, false, false), Some(Getter::Zero));
        assert_eq!(Getter::fixed(3, 4, false, false), None);
    }

    #[test]
    fn packed_reads() {
        let data = [0b1110_0100u8, 0x0f];
        assert_eq!(Getter::Bit2.fetch(&data, 0).as_int(), Some(0));
        assert_eq!(Getter::Bit2.fetch(&data, 1).as_int(), Some(1));
        assert_eq!(Getter::Bit2.fetch(&data, 3).as_int(), Some(3));
        assert_eq!(Getter::Bit4.fetch(&data, 1).as_int(), Some(14));
        assert_eq!(Getter::I8.fetch(&[0xff], 0).as_int(), Some(-1));
        assert_eq!(Getter::I16Rev.fetch(&[0x01, 0x02], 0).as_int(), Some(0x0102));
        assert!(Getter::I32.fetch(&data, 0).is_error());
    }

    #[test]
    fn builder_packs_items() {
        let mut b = StrVecBuilder::new();
        b.push(b"abc");
        b.push(b"");
        b.push(b"de");
        let v = b.finish();
        assert_eq!(v.len(), 3);
        assert_eq!(v.bytes(0), b"abc");
        assert_eq!(v.bytes(1), b"");
        assert_eq!(v.text(2), "de");
        assert_eq!(v.bytes(7), b"");
    }
}

//! Width packing of int vectors.
//!
//! Ints are stored in the narrowest of seven layouts: nothing (all zero),
//! 1, 2 or 4 bits per value, or 8, 16 or 32 bit signed values. The layout
//! is not recorded; readers derive it from the byte size and row count, so
//! a few tiny vectors are padded to keep that mapping unambiguous.

use vq_core::bits::top_bit;

const LO_WIDTHS: &[u8; 33] = b"444444445555555566666666666666666";
const HI_WIDTHS: &[u8; 33] = b"012334445555555566666666666666666";

/// Byte sizes and layouts for fewer than five values of at most 4 bits,
/// indexed by `[width - 1][rows - 1]`.
const TINY_BYTES: [[usize; 4]; 3] = [[1, 1, 1, 1], [1, 1, 1, 1], [1, 1, 2, 2]];
const TINY_WIDTHS: [[u8; 4]; 3] = [[3, 3, 2, 2], [3, 3, 2, 2], [3, 3, 3, 3]];

/// Layout code for values in `lo..=hi`: 0 for none, 1..=3 for 1, 2 and
/// 4 bits, 4..=6 for 8, 16 and 32 bit signed values.
pub fn min_width(lo: i32, hi: i32) -> u8 {
    let lo = if lo >= 0 {
        0
    } else {
        LO_WIDTHS[(top_bit(!lo as u32) + 1) as usize] & 7
    };
    let hi = if hi < 0 {
        0
    } else {
        HI_WIDTHS[(top_bit(hi as u32) + 1) as usize] & 7
    };
    lo.max(hi)
}

/// Pack `values` in their narrowest layout.
pub fn pack_ints(values: &[i32]) -> Vec<u8> {
    let rows = values.len();
    let (lo, hi) = values
        .iter()
        .fold((0, 0), |(lo, hi), &v| (v.min(lo), v.max(hi)));
    let width = min_width(lo, hi);

    if width >= 6 {
        return values.iter().flat_map(|v| v.to_le_bytes()).collect();
    }
    if rows == 0 || width == 0 {
        return Vec::new();
    }

    let (bytes, width) = if rows < 5 && width < 4 {
        let (w, r) = (width as usize - 1, rows - 1);
        (TINY_BYTES[w][r], TINY_WIDTHS[w][r])
    } else {
        (((rows << width) + 14) >> 4, width)
    };

    let mut out = vec![0u8; bytes];
    match width {
        1 => {
            for (i, v) in values.iter().enumerate() {
                out[i >> 3] |= ((v & 1) as u8) << (i & 7);
            }
        }
        2 => {
            for (i, v) in values.iter().enumerate() {
                out[i >> 2] |= ((v & 3) as u8) << (2 * (i & 3));
            }
        }
        3 => {
            for (i, v) in values.iter().enumerate() {
                out[i >> 1] |= ((v & 15) as u8) << (4 * (i & 1));
            }
        }
        4 => {
            for (o, v) in out.iter_mut().zip(values) {
                *o = *v as i8 as u8;
            }
        }
        _ => {
            for (i, v) in values.iter().enumerate() {
                out[2 * i..2 * i + 2].copy_from_slice(&(*v as i16).to_le_bytes());
            }
        }
    }
    out
}

pub fn pack_wides(values: impl Iterator<Item = i64>) -> Vec<u8> {
    values.flat_map(|v| v.to_le_bytes()).collect()
}

pub fn pack_floats(values: impl Iterator<Item = f32>) -> Vec<u8> {
    values.flat_map(|v| v.to_le_bytes()).collect()
}

pub fn pack_doubles(values: impl Iterator<Item = f64>) -> Vec<u8> {
    values.flat_map(|v| v.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vq_core::vector::Getter;
    use vq_core::Item;

    #[test]
    fn widths() {
        assert_eq!(min_width(0, 0), 0);
        assert_eq!(min_width(0, 1), 1);
        assert_eq!(min_width(0, 3), 2);
        assert_eq!(min_width(0, 15), 3);
        assert_eq!(min_width(0, 127), 4);
        assert_eq!(min_width(-1, 0), 4);
        assert_eq!(min_width(-128, 5), 4);
        assert_eq!(min_width(-129, 0), 5);
        assert_eq!(min_width(0, 32767), 5);
        assert_eq!(min_width(0, 32768), 6);
        assert_eq!(min_width(i32::MIN, 0), 6);
    }

    #[test]
    fn tiny_vectors_are_padded() {
        assert_eq!(pack_ints(&[1]), vec![1]);
        assert_eq!(pack_ints(&[1, 0, 1]), vec![0b010001]);
        assert_eq!(pack_ints(&[9, 3, 7]).len(), 2);
        assert_eq!(pack_ints(&[0, 0, 0]), Vec::<u8>::new());
        assert_eq!(pack_ints(&[1, 2, 3]).len(), 1);
        assert_eq!(pack_ints(&[-1]), vec![0xFF]);
        assert_eq!(pack_ints(&[1000, -2]).len(), 4);
        assert_eq!(pack_ints(&[1 << 20]).len(), 4);
    }

    proptest! {
        #[test]
        fn packed_ints_decode(values in proptest::collection::vec(prop_oneof![
            0i32..2, 0i32..16, -100i32..100, -40000i32..40000, any::<i32>()
        ], 0..40)) {
            let packed = pack_ints(&values);
            let getter = Getter::fixed(packed.len(), values.len(), false, false);
            if values.is_empty() {
                prop_assert!(packed.is_empty());
            } else {
                let getter = getter.unwrap();
                for (r, v) in values.iter().enumerate() {
                    prop_assert_eq!(getter.fetch(&packed, r), Item::Int(*v));
                }
            }
        }
    }
}

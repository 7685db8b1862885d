//! Packed bitmaps and Elias-gamma run coding.
//!
//! A bitmap stores bit `i` at `(bytes[i >> 3] >> (i & 7)) & 1`, which is
//! also the on-disk layout of 1-bit integer columns. Run coding stores the
//! initial bit value followed by the lengths of alternating runs, each as
//! an Elias-gamma code (`top_bit(n)` zero bits, then `n` MSB first).

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitmap {
    bytes: Vec<u8>,
    len: usize,
}

impl Bitmap {
    /// All-zero bitmap of `len` bits.
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; (len + 7) / 8],
            len,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>, len: usize) -> Self {
        let mut bytes = bytes;
        if bytes.len() < (len + 7) / 8 {
            bytes.resize((len + 7) / 8, 0);
        }
        Self { bytes, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..(self.len + 7) / 8]
    }

    pub fn test(&self, i: usize) -> bool {
        i < self.len && (self.bytes[i >> 3] >> (i & 7)) & 1 != 0
    }

    /// Set bit `i`, growing the bitmap when needed. Returns true if the bit
    /// was not set before.
    pub fn set(&mut self, i: usize) -> bool {
        if i >= self.len {
            let need = i / 8 + 1;
            if need > self.bytes.len() {
                self.bytes.resize(need + need / 2, 0);
            }
            self.len = i + 1;
        }
        let mask = 1u8 << (i & 7);
        let fresh = self.bytes[i >> 3] & mask == 0;
        self.bytes[i >> 3] |= mask;
        fresh
    }

    pub fn clear(&mut self, i: usize) {
        if i < self.len {
            self.bytes[i >> 3] &= !(1u8 << (i & 7));
        }
    }

    pub fn set_range(&mut self, from: usize, count: usize) {
        for i in from..from + count {
            self.set(i);
        }
    }

    /// Make sure the bitmap covers at least `count` bits.
    pub fn min_len(&mut self, count: usize) {
        if count > self.len {
            let need = (count + 7) / 8;
            if need > self.bytes.len() {
                self.bytes.resize(need, 0);
            }
            self.len = count;
        }
    }

    /// Next run of set bits at or after `*from`. On return `*from` points
    /// just past the run.
    pub fn next_run(&self, from: &mut usize) -> Option<(usize, usize)> {
        let mut i = *from;
        while i < self.len && !self.test(i) {
            i += 1;
        }
        if i >= self.len {
            *from = self.len;
            return None;
        }
        let start = i;
        while i < self.len && self.test(i) {
            i += 1;
        }
        *from = i;
        Some((start, i - start))
    }

    pub fn runs(&self) -> Runs<'_> {
        Runs { bits: self, pos: 0 }
    }

    pub fn count_ones(&self) -> usize {
        self.runs().map(|(_, n)| n).sum()
    }

    /// Initial bit value followed by the lengths of alternating runs.
    pub fn bit_runs(&self) -> Vec<usize> {
        let mut out = Vec::new();
        if self.len == 0 {
            return out;
        }
        let mut last = self.test(0);
        out.push(last as usize);
        let mut n = 0;
        for i in 0..self.len {
            let b = self.test(i);
            if b != last {
                out.push(n);
                n = 0;
                last = b;
            }
            n += 1;
        }
        out.push(n);
        out
    }

    /// Elias run coding. Returns the packed output and its length in bits.
    pub fn to_elias(&self) -> (Vec<u8>, usize) {
        let mut out = vec![0u8; (self.len + self.len / 2) / 8 + 1];
        if self.len == 0 {
            return (out, 0);
        }
        let mut last = self.test(0);
        if last {
            out[0] = 0x80;
        }
        let mut pos = 1;
        let mut n = 0;
        for i in 0..self.len {
            let b = self.test(i);
            if b != last {
                emit_gamma(&mut out, n, &mut pos);
                n = 0;
                last = b;
            }
            n += 1;
        }
        emit_gamma(&mut out, n, &mut pos);
        out.truncate((pos + 7) / 8);
        (out, pos)
    }

    /// Rebuild a bitmap of `len` bits from Elias run coding.
    pub fn from_elias(bytes: &[u8], len: usize) -> Self {
        let mut bits = Bitmap::new(len);
        if bytes.is_empty() {
            return bits;
        }
        let mut reader = EliasReader::new(bytes);
        let mut from = if bytes[0] & 0x80 != 0 { 0 } else { reader.next_value() };
        loop {
            let count = reader.next_value();
            if count == 0 {
                break;
            }
            bits.set_range(from, count);
            from += count + reader.next_value();
        }
        bits.min_len(len);
        bits
    }
}

pub struct Runs<'a> {
    bits: &'a Bitmap,
    pos: usize,
}

impl Iterator for Runs<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        self.bits.next_run(&mut self.pos)
    }
}

/// floor(log2 v), or -1 for zero.
pub fn top_bit(v: u32) -> i32 {
    if v == 0 {
        -1
    } else {
        31 - v.leading_zeros() as i32
    }
}

fn emit_gamma(out: &mut Vec<u8>, val: usize, pos: &mut usize) {
    let val = val as u32;
    let top = top_bit(val);
    let need = (*pos + 2 * top as usize + 1 + 7) / 8;
    if out.len() < need {
        out.resize(need, 0);
    }
    *pos += top as usize;
    for i in (0..=top).rev() {
        if (val >> i) & 1 != 0 {
            out[*pos >> 3] |= 0x80 >> (*pos & 7);
        }
        *pos += 1;
    }
}

/// Sequential decoder for Elias-gamma codes, skipping the leading
/// initial-value bit.
pub struct EliasReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> EliasReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 1 }
    }

    fn bit(&self, pos: usize) -> Option<bool> {
        self.bytes
            .get(pos >> 3)
            .map(|b| b & (0x80 >> (pos & 7)) != 0)
    }

    /// Decode the next value; 0 signals the end of the stream.
    pub fn next_value(&mut self) -> usize {
        let mut zeros = 0;
        loop {
            match self.bit(self.pos) {
                None => return 0,
                Some(false) => {
                    zeros += 1;
                    self.pos += 1;
                }
                Some(true) => break,
            }
        }
        if zeros > 31 {
            return 0;
        }
        let mut v = 0usize;
        for _ in 0..=zeros {
            match self.bit(self.pos) {
                Some(b) => v = (v << 1) | b as usize,
                None => return 0,
            }
            self.pos += 1;
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn set_grows_and_reports_freshness() {
        let mut b = Bitmap::default();
        assert!(b.set(10));
        assert!(!b.set(10));
        assert_eq!(b.len(), 11);
        assert!(b.test(10));
        assert!(!b.test(9));
        b.clear(10);
        assert!(!b.test(10));
    }

    #[test]
    fn runs_and_counts() {
        let mut b = Bitmap::new(20);
        b.set_range(2, 3);
        b.set_range(10, 5);
        let runs: Vec<_> = b.runs().collect();
        assert_eq!(runs, vec![(2, 3), (10, 5)]);
        assert_eq!(b.count_ones(), 8);
        assert_eq!(b.bit_runs(), vec![0, 2, 3, 5, 5, 5]);
    }

    #[test]
    fn top_bit_values() {
        assert_eq!(top_bit(0), -1);
        assert_eq!(top_bit(1), 0);
        assert_eq!(top_bit(2), 1);
        assert_eq!(top_bit(255), 7);
        assert_eq!(top_bit(256), 8);
    }

    #[test]
    fn elias_leading_ones() {
        let mut b = Bitmap::new(300);
        b.set_range(0, 7);
        b.set_range(250, 50);
        let (bytes, nbits) = b.to_elias();
        assert!(nbits < 40);
        assert_eq!(Bitmap::from_elias(&bytes, 300), b);
    }

    proptest! {
        #[test]
        fn elias_reproduces_runs(bits in proptest::collection::vec(any::<bool>(), 1..400)) {
            let mut b = Bitmap::new(bits.len());
            for (i, on) in bits.iter().enumerate() {
                if *on {
                    b.set(i);
                }
            }
            let (bytes, _) = b.to_elias();
            let back = Bitmap::from_elias(&bytes, bits.len());
            prop_assert_eq!(back.runs().collect::<Vec<_>>(), b.runs().collect::<Vec<_>>());
        }
    }
}

//! Row fingerprints and open-addressed probing.
//!
//! The hash values here are part of observable behavior: the probe order
//! of every hash table (and so the order in which groups and unique rows
//! are discovered) depends on them.

use crate::column::Column;
use crate::item::Item;
use crate::seq::SeqKind;
use crate::vector::StrVec;
use crate::view::View;

/// Extra step perturbation per table size, indexed by `log2bits(size - 1)`.
pub const SLACK: [usize; 32] = [
    0, 0, 3, 3, 3, 5, 3, 3, 29, 17, 9, 5, 83, 27, 43, 3, 45, 9, 39, 39, 9, 5, 3, 33, 27, 9, 71,
    39, 9, 5, 83, 0,
];

/// Multiplicative string hash over signed bytes, with the length mixed in.
pub fn string_hash(bytes: &[u8]) -> i32 {
    let Some(&first) = bytes.first() else {
        return 0;
    };
    let mut h = ((first as i8 as i32).wrapping_mul(0xFF)).wrapping_shl(7);
    for &b in bytes {
        h = 1_000_003i32.wrapping_mul(h) ^ (b as i8 as i32);
    }
    h ^ bytes.len() as i32
}

fn fold64(bits: u64) -> i32 {
    (bits as u32 ^ (bits >> 32) as u32) as i32
}

pub fn item_hash(item: &Item) -> i32 {
    match item {
        Item::Int(v) => *v,
        Item::Wide(v) => fold64(*v as u64),
        Item::Float(v) => v.to_bits() as i32,
        Item::Double(v) => fold64(v.to_bits()),
        Item::Str(s) => string_hash(s.as_bytes()),
        Item::Bytes(b) => string_hash(b),
        Item::View(v) => hash_values(v).iter().fold(0, |h, x| h ^ x) ^ v.size() as i32,
        _ => 0,
    }
}

pub fn hash_col(col: &Column) -> Vec<i32> {
    (0..col.len()).map(|r| item_hash(&col.get(r))).collect()
}

/// One hash per row: the xor of its column hashes.
pub fn hash_values(view: &View) -> Vec<i32> {
    let rows = view.size();
    let mut out = vec![0; rows];
    for c in 0..view.width() {
        if let Some(col) = view.column(c) {
            for (r, h) in out.iter_mut().enumerate() {
                *h ^= item_hash(&col.get(r));
            }
        }
    }
    out
}

pub fn row_hash(view: &View, row: usize) -> i32 {
    (0..view.width()).fold(0, |h, c| h ^ item_hash(&view.get(row, c)))
}

/// Smallest `bits` with `1 << bits >= n`.
pub fn log2bits(n: usize) -> usize {
    let mut bits = 0;
    while (1usize << bits) < n {
        bits += 1;
    }
    bits
}

/// Probe vector size for `rows` entries: a power of two of at least 4/3
/// the row count, minimum 4.
pub fn table_size(rows: usize) -> usize {
    1 << log2bits(4 * rows / 3).max(2)
}

pub fn prime_for(size: usize) -> usize {
    size + SLACK[log2bits(size.saturating_sub(1)).min(31)]
}

/// Probe sequence for one hash value.
///
/// Double hashing with a doubling step for at most `size` probes, then a
/// linear sweep over the whole table, so every slot is reached and the
/// sequence always ends.
pub struct Probe {
    probe: usize,
    step: usize,
    mask: usize,
    prime: usize,
    hashed: usize,
    swept: usize,
}

impl Probe {
    pub fn new(hash: i32, size: usize) -> Self {
        let mask = size - 1;
        let step = ((hash ^ (hash >> 3)) as usize) & mask;
        Self {
            probe: (!hash) as usize & mask,
            step: if step == 0 { mask } else { step },
            mask,
            prime: prime_for(size),
            hashed: 0,
            swept: 0,
        }
    }
}

impl Iterator for Probe {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let size = self.mask + 1;
        if self.hashed < size {
            if self.hashed > 0 {
                self.step <<= 1;
                if self.step > self.mask {
                    self.step ^= self.prime;
                }
            }
            self.hashed += 1;
            self.probe = (self.probe + self.step) & self.mask;
            return Some(self.probe);
        }
        if self.swept < size {
            self.swept += 1;
            self.probe = (self.probe + 1) & self.mask;
            return Some(self.probe);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Entry (slot value minus one) whose key matched.
    Found(usize),
    /// First empty slot on the probe path.
    Empty(usize),
    Full,
}

/// Walk the probe path of `hash` through `table` (0 = empty, otherwise
/// entry + 1) until `matches` accepts an entry or an empty slot turns up.
pub fn find_slot(table: &[i32], hash: i32, mut matches: impl FnMut(usize) -> bool) -> Slot {
    for probe in Probe::new(hash, table.len()) {
        match table[probe] {
            0 => return Slot::Empty(probe),
            v => {
                let entry = (v - 1) as usize;
                if matches(entry) {
                    return Slot::Found(entry);
                }
            }
        }
    }
    Slot::Full
}

fn build_lookup(strings: &StrVec) -> Vec<i32> {
    let mut table = vec![0; table_size(strings.len())];
    for r in 0..strings.len() {
        let key = strings.bytes(r);
        // duplicates keep their first occurrence
        if let Slot::Empty(slot) = find_slot(&table, string_hash(key), |e| strings.bytes(e) == key) {
            table[slot] = r as i32 + 1;
        }
    }
    table
}

/// Row of `key` in a string column. String vectors cache their lookup
/// table on first use; other columns are scanned.
pub fn string_lookup(key: &str, col: &Column) -> Option<usize> {
    match col.seq().kind() {
        SeqKind::Strings(strings) => {
            let table = strings.lookup_table(|| build_lookup(strings));
            let key = key.as_bytes();
            match find_slot(table, string_hash(key), |e| strings.bytes(e) == key) {
                Slot::Found(row) => Some(row),
                _ => None,
            }
        }
        _ => (0..col.len()).find(|&r| col.get(r).as_str() == Some(key)),
    }
}

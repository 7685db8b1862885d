//! Columns: a sequence plus the position this column reads from it.

use std::fmt;
use std::rc::Rc;

use crate::bits::Bitmap;
use crate::error::{Error, ErrorCode, Result};
use crate::item::{Item, ItemType, ToItem};
use crate::seq::{SeqKind, Sequence};
use crate::vector::{StrVec, StrVecBuilder};
use crate::view::View;

#[derive(Clone)]
pub struct Column {
    seq: Rc<Sequence>,
    pos: usize,
}

impl Column {
    pub fn new(seq: Rc<Sequence>) -> Self {
        Self { seq, pos: 0 }
    }

    pub fn with_pos(seq: Rc<Sequence>, pos: usize) -> Self {
        Self { seq, pos }
    }

    pub fn seq(&self) -> &Rc<Sequence> {
        &self.seq
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn get(&self, row: usize) -> Item {
        self.seq.get(row, self.pos)
    }

    /// Int value at `row`; wides are truncated, anything else reads as 0.
    pub fn int(&self, row: usize) -> i32 {
        match self.get(row) {
            Item::Int(v) => v,
            Item::Wide(v) => v as i32,
            _ => 0,
        }
    }

    pub fn to_ints(&self) -> Vec<i32> {
        if let SeqKind::Ints(v) = self.seq.kind() {
            return v.clone();
        }
        (0..self.len()).map(|r| self.int(r)).collect()
    }

    pub fn from_ints(v: Vec<i32>) -> Self {
        Self::new(Sequence::new(v.len(), SeqKind::Ints(v)))
    }

    pub fn from_wides(v: Vec<i64>) -> Self {
        Self::new(Sequence::new(v.len(), SeqKind::Wides(v)))
    }

    pub fn from_floats(v: Vec<f32>) -> Self {
        Self::new(Sequence::new(v.len(), SeqKind::Floats(v)))
    }

    pub fn from_doubles(v: Vec<f64>) -> Self {
        Self::new(Sequence::new(v.len(), SeqKind::Doubles(v)))
    }

    pub fn from_strs<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let v = StrVec::from_strs(items.into_iter().map(|s| s.as_ref().as_bytes().to_vec()));
        Self::new(Sequence::new(v.len(), SeqKind::Strings(v)))
    }

    pub fn from_bytes<I, B>(items: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let v = StrVec::from_strs(items);
        Self::new(Sequence::new(v.len(), SeqKind::Bytes(v)))
    }

    pub fn from_views(v: Vec<View>) -> Self {
        Self::new(Sequence::new(v.len(), SeqKind::Views(v)))
    }

    pub fn from_bits(bits: Bitmap) -> Self {
        Self::new(Sequence::new(bits.len(), SeqKind::Bits(bits)))
    }

    pub fn iota(count: usize) -> Self {
        Self::new(Sequence::new(count, SeqKind::Iota))
    }

    pub fn zeros(count: usize) -> Self {
        Self::new(Sequence::new(count, SeqKind::Zeros))
    }

    /// Row counts of the views in `views`.
    pub fn counts(views: Column) -> Self {
        Self::new(Sequence::new(views.len(), SeqKind::Counts(views)))
    }

    /// Ascending row numbers below `size` which are *not* listed in the
    /// sorted index column `omit`.
    pub fn omit(omit: &Column, size: usize) -> Self {
        let mut drop = Bitmap::new(size);
        for r in 0..omit.len() {
            if let Ok(i) = usize::try_from(omit.int(r)) {
                if i < size {
                    drop.set(i);
                }
            }
        }
        Self::from_ints((0..size).filter(|&i| !drop.test(i)).map(|i| i as i32).collect())
    }

    /// Empty column of the given type.
    pub fn empty(ty: ItemType) -> Self {
        match ty {
            ItemType::Wide => Self::from_wides(Vec::new()),
            ItemType::Float => Self::from_floats(Vec::new()),
            ItemType::Double => Self::from_doubles(Vec::new()),
            ItemType::Str => Self::from_strs(Vec::<&str>::new()),
            ItemType::Bytes => Self::from_bytes(Vec::<Vec<u8>>::new()),
            ItemType::View => Self::from_views(Vec::new()),
            _ => Self::from_ints(Vec::new()),
        }
    }

    /// Materialize typed items into a concrete vector of type `ty`.
    /// Items must already have that type.
    pub fn from_items(ty: ItemType, items: Vec<Item>) -> Result<Self> {
        let bad = |row: usize| Error::Coerce { row, ty };
        Ok(match ty {
            ItemType::Int => Self::from_ints(collect(items, |i| i.as_int(), bad)?),
            ItemType::Wide => Self::from_wides(collect(items, |i| i.as_wide(), bad)?),
            ItemType::Float => Self::from_floats(collect(items, |i| i.as_float(), bad)?),
            ItemType::Double => Self::from_doubles(collect(items, |i| i.as_double(), bad)?),
            ItemType::Str => {
                let mut b = StrVecBuilder::new();
                for (row, item) in items.iter().enumerate() {
                    b.push(item.as_str().ok_or_else(|| bad(row))?.as_bytes());
                }
                let v = b.finish();
                Self::new(Sequence::new(v.len(), SeqKind::Strings(v)))
            }
            ItemType::Bytes => {
                let mut b = StrVecBuilder::new();
                for (row, item) in items.iter().enumerate() {
                    b.push(item.as_bytes().ok_or_else(|| bad(row))?);
                }
                let v = b.finish();
                Self::new(Sequence::new(v.len(), SeqKind::Bytes(v)))
            }
            ItemType::View => Self::from_views(collect(items, |i| i.into_view(), bad)?),
            _ => return Err(Error::Coerce { row: 0, ty }),
        })
    }
}

fn collect<T>(
    items: Vec<Item>,
    mut pick: impl FnMut(Item) -> Option<T>,
    bad: impl Fn(usize) -> Error,
) -> Result<Vec<T>> {
    items
        .into_iter()
        .enumerate()
        .map(|(row, item)| pick(item).ok_or_else(|| bad(row)))
        .collect()
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column({:?} @{})", self.seq, self.pos)
    }
}

/// Convert host values into a typed column, atomically: the first value
/// that does not convert fails the whole call.
pub fn coerce_column<T: ToItem>(ty: ItemType, values: &[T]) -> Result<Column> {
    let items = values
        .iter()
        .enumerate()
        .map(|(row, v)| v.to_item(ty).ok_or(Error::Coerce { row, ty }))
        .collect::<Result<Vec<_>>>()?;
    Column::from_items(ty, items)
}

/// Re-type an existing column. A no-op when item 0 already has the target
/// type.
pub fn coerce_items(ty: ItemType, col: &Column) -> Result<Column> {
    if col.is_empty() || col.get(0).item_type() == ty {
        return Ok(col.clone());
    }
    let items = (0..col.len())
        .map(|row| col.get(row).convert(ty).ok_or(Error::Coerce { row, ty }))
        .collect::<Result<Vec<_>>>()?;
    Column::from_items(ty, items)
}

/// `coerce_items` with a one-letter type code.
pub fn coerce_by_code(code: &str, col: &Column) -> Result<Column> {
    let ty = code.bytes().next().map_or(ItemType::Unknown, ItemType::from_code);
    match ty {
        ItemType::Unknown | ItemType::Error => Err(Error::Desc {
            desc: code.to_string(),
            pos: 0,
        }),
        _ => coerce_items(ty, col),
    }
}

/// A string-vector backed copy of `col` (the column itself if it already
/// is one). Name lookups cache their probe table on the string vector.
pub fn force_string_column(col: &Column) -> Column {
    if matches!(col.seq().kind(), SeqKind::Strings(_)) {
        return col.clone();
    }
    let mut b = StrVecBuilder::new();
    for r in 0..col.len() {
        match col.get(r) {
            Item::Str(s) => b.push(s.as_bytes()),
            Item::Bytes(v) => b.push(&v),
            other => b.push(other.to_string().as_bytes()),
        }
    }
    let v = b.finish();
    Column::new(Sequence::new(v.len(), SeqKind::Strings(v)))
}

/// A copy of int column `col` with `diff` zeroed slots inserted at `pos`,
/// or `-diff` slots removed there.
pub fn resize_ints(col: &Column, pos: usize, diff: isize) -> Result<Column> {
    let mut v = col.to_ints();
    if pos > v.len() {
        return Err(ErrorCode::RowOutOfRange.into());
    }
    if diff >= 0 {
        v.splice(pos..pos, std::iter::repeat(0).take(diff as usize));
    } else {
        let end = pos + diff.unsigned_abs();
        if end > v.len() {
            return Err(ErrorCode::RowOutOfRange.into());
        }
        v.drain(pos..end);
    }
    Ok(Column::from_ints(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omit_is_the_complement() {
        let omit = Column::from_ints(vec![1, 3]);
        assert_eq!(Column::omit(&omit, 5).to_ints(), vec![0, 2, 4]);
    }

    #[test]
    fn coercion_is_atomic() {
        let col = coerce_column(ItemType::Int, &["1", "2", "3"]).unwrap();
        assert_eq!(col.to_ints(), vec![1, 2, 3]);

        match coerce_column(ItemType::Int, &["1", "x", "3"]) {
            Err(Error::Coerce { row, .. }) => assert_eq!(row, 1),
            other => panic!("unexpected {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn coerce_items_is_a_noop_for_matching_types() {
        let col = Column::from_ints(vec![4, 5]);
        let same = coerce_items(ItemType::Int, &col).unwrap();
        assert!(Rc::ptr_eq(same.seq(), col.seq()));
        let text = coerce_by_code("S", &col).unwrap();
        assert_eq!(text.get(1).as_str(), Some("5"));
        assert!(coerce_by_code("Q", &col).is_err());
    }

    #[test]
    fn resize_inserts_and_removes() {
        let col = Column::from_ints(vec![1, 2, 3]);
        assert_eq!(resize_ints(&col, 1, 2).unwrap().to_ints(), vec![1, 0, 0, 2, 3]);
        assert_eq!(resize_ints(&col, 0, -2).unwrap().to_ints(), vec![3]);
        assert!(resize_ints(&col, 2, -2).is_err());
        assert_eq!(col.to_ints(), vec![1, 2, 3]);
    }

    #[test]
    fn string_columns() {
        let col = Column::from_strs(["a", "bc"]);
        assert_eq!(col.get(1).as_str(), Some("bc"));
        let forced = force_string_column(&Column::from_ints(vec![7]));
        assert_eq!(forced.get(0).as_str(), Some("7"));
    }
}

//! Sequences: the shared storage behind every column.
//!
//! A sequence is a typed run of `count` items. Concrete vectors, computed
//! columns and all the virtual views are variants of one closed enum, so an
//! access is a single match instead of a function-pointer dispatch. Virtual
//! kinds keep their parent alive through the `View` handle they store.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::bits::Bitmap;
use crate::column::Column;
use crate::error::ErrorCode;
use crate::item::Item;
use crate::mutable::MutState;
use crate::region::Region;
use crate::settable::SetState;
use crate::vector::{Getter, StrVec};
use crate::view::View;
use crate::virt;

/// Lazily produces the nested view stored at a row of a loaded column.
pub trait SubviewSource: fmt::Debug {
    /// The nested view of `row`, or the code to report in its place.
    fn subview(&self, row: usize) -> std::result::Result<View, ErrorCode>;
}

pub enum SeqKind {
    Ints(Vec<i32>),
    Wides(Vec<i64>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    /// Packed integers or raw floats inside a byte region.
    Fixed { region: Region, getter: Getter },
    Bits(Bitmap),
    Strings(StrVec),
    Bytes(StrVec),
    Views(Vec<View>),
    /// Row number as an int.
    Iota,
    /// Row count of each view in a view column.
    Counts(Column),
    /// No data at all, only a row count.
    Zeros,
    Remap {
        parent: View,
        map: Column,
        start: usize,
    },
    Step {
        parent: View,
        offset: i64,
        rate: usize,
        step: i64,
    },
    Concat {
        first: View,
        second: View,
    },
    Grouped {
        parent: View,
        starts: Column,
        groups: Column,
        cache: Vec<OnceCell<View>>,
    },
    Ungrouped {
        parent: View,
        map: Column,
        subcol: usize,
        swidth: usize,
    },
    Blocked {
        parent: View,
        limits: Vec<usize>,
    },
    Mutable(RefCell<MutState>),
    Settable(RefCell<SetState>),
    /// Strings or bytes loaded from a region; spans are `(offset, len)`.
    MappedStr {
        region: Region,
        spans: Vec<(usize, usize)>,
        text: bool,
    },
    MappedViews {
        source: Rc<dyn SubviewSource>,
        cache: Vec<OnceCell<View>>,
    },
}

pub struct Sequence {
    count: Cell<usize>,
    kind: SeqKind,
}

impl Sequence {
    pub fn new(count: usize, kind: SeqKind) -> Rc<Sequence> {
        Rc::new(Sequence {
            count: Cell::new(count),
            kind,
        })
    }

    pub fn len(&self) -> usize {
        self.count.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn set_len(&self, count: usize) {
        self.count.set(count);
    }

    pub fn kind(&self) -> &SeqKind {
        &self.kind
    }

    /// Short name of the sequence kind, for dumps and tracing.
    pub fn name(&self) -> &'static str {
        match &self.kind {
            SeqKind::Ints(_) => "ints",
            SeqKind::Wides(_) => "wides",
            SeqKind::Floats(_) => "floats",
            SeqKind::Doubles(_) => "doubles",
            SeqKind::Fixed { .. } => "fixed",
            SeqKind::Bits(_) => "bits",
            SeqKind::Strings(_) => "strings",
            SeqKind::Bytes(_) => "bytes",
            SeqKind::Views(_) => "views",
            SeqKind::Iota => "iota",
            SeqKind::Counts(_) => "counts",
            SeqKind::Zeros => "zeros",
            SeqKind::Remap { .. } => "remap",
            SeqKind::Step { .. } => "step",
            SeqKind::Concat { .. } => "concat",
            SeqKind::Grouped { .. } => "grouped",
            SeqKind::Ungrouped { .. } => "ungrouped",
            SeqKind::Blocked { .. } => "blocked",
            SeqKind::Mutable(_) => "mutable",
            SeqKind::Settable(_) => "settable",
            SeqKind::MappedStr { .. } => "mapped",
            SeqKind::MappedViews { .. } => "subviews",
        }
    }

    /// Item at `row` for the column at `pos` of this sequence.
    pub fn get(&self, row: usize, pos: usize) -> Item {
        if row >= self.len() {
            return Item::Error(ErrorCode::RowOutOfRange);
        }
        match &self.kind {
            SeqKind::Ints(v) => Item::Int(v[row]),
            SeqKind::Wides(v) => Item::Wide(v[row]),
            SeqKind::Floats(v) => Item::Float(v[row]),
            SeqKind::Doubles(v) => Item::Double(v[row]),
            SeqKind::Fixed { region, getter } => getter.fetch(region.bytes(), row),
            SeqKind::Bits(b) => Item::Int(b.test(row) as i32),
            SeqKind::Strings(s) => Item::Str(s.text(row)),
            SeqKind::Bytes(s) => Item::Bytes(s.bytes(row).to_vec()),
            SeqKind::Views(v) => Item::View(v[row].clone()),
            SeqKind::Iota => Item::Int(row as i32),
            SeqKind::Counts(col) => match col.get(row) {
                Item::View(v) => Item::Int(v.size() as i32),
                other => other,
            },
            SeqKind::Zeros => Item::Int(0),
            SeqKind::Remap { parent, map, start } => {
                let mut r = (start + row) as i64;
                let back = map.int(r as usize);
                if back < 0 {
                    r += back as i64;
                }
                match usize::try_from(map.int(r.max(0) as usize)) {
                    Ok(prow) => parent.get(prow, pos),
                    Err(_) => Item::Error(ErrorCode::RowOutOfRange),
                }
            }
            SeqKind::Step {
                parent,
                offset,
                rate,
                step,
            } => {
                let rows = parent.size() as i64;
                if rows == 0 {
                    return Item::Error(ErrorCode::RowOutOfRange);
                }
                let r = offset + (row / rate) as i64 * step;
                parent.get(r.rem_euclid(rows) as usize, pos)
            }
            SeqKind::Concat { first, second } => {
                let n = first.size();
                if row < n {
                    first.get(row, pos)
                } else {
                    second.get(row - n, pos)
                }
            }
            SeqKind::Grouped {
                parent,
                starts,
                groups,
                cache,
            } => {
                let sub = cache[row].get_or_init(|| {
                    let from = if row > 0 { starts.int(row - 1) as usize } else { 0 };
                    let to = starts.int(row) as usize;
                    virt::remap_range(parent, groups, from, to.saturating_sub(from))
                });
                Item::View(sub.clone())
            }
            SeqKind::Ungrouped {
                parent,
                map,
                subcol,
                swidth,
            } => {
                let entry = map.int(row);
                let (prow, subrow) = if entry < 0 {
                    (map.int((row as i64 + entry as i64) as usize), (-entry) as usize)
                } else {
                    (entry, 0)
                };
                let prow = prow as usize;
                if *subcol <= pos && pos < subcol + swidth {
                    match parent.get(prow, *subcol) {
                        Item::View(sub) => sub.get(subrow, pos - subcol),
                        other => other,
                    }
                } else if pos >= *subcol {
                    parent.get(prow, pos + 1 - swidth)
                } else {
                    parent.get(prow, pos)
                }
            }
            SeqKind::Blocked { parent, limits } => {
                let last = limits.len().saturating_sub(1);
                let mut block = 0;
                while block < last && block + limits[block] < row {
                    block += 1;
                }
                let (block, row) = if row == block + limits[block] {
                    (last, block)
                } else if block > 0 {
                    (block, row - (block + limits[block - 1]))
                } else {
                    (block, row)
                };
                match parent.get(block, 0) {
                    Item::View(sub) => sub.get(row, pos),
                    other => other,
                }
            }
            SeqKind::Mutable(state) => state.borrow().get(row, pos),
            SeqKind::Settable(state) => state.borrow().get(row, pos),
            SeqKind::MappedStr { region, spans, text } => {
                let bytes = spans
                    .get(row)
                    .and_then(|&(off, len)| region.bytes().get(off..off + len))
                    .unwrap_or(&[]);
                if *text {
                    Item::Str(String::from_utf8_lossy(bytes).into_owned())
                } else {
                    Item::Bytes(bytes.to_vec())
                }
            }
            SeqKind::MappedViews { source, cache } => {
                match cache[row].get_or_try_init(|| source.subview(row)) {
                    Ok(v) => Item::View(v.clone()),
                    Err(code) => Item::Error(code),
                }
            }
        }
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sequence({} x{})", self.name(), self.len())
    }
}

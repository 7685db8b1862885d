//! Mutable overlay: row ranges spliced over an immutable parent.
//!
//! A mutable view is a sorted list of ranges covering its rows. Each range
//! reads either from the parent (`added == None`) or from a view of
//! inserted rows, starting at `shift` in that source. The last range is a
//! sentinel starting at the current row count.
//!
//! Mutations take the view by value. A view that nothing else holds is
//! changed in place; a shared one is copied first, so every other handle
//! (and every virtual view built on it) keeps seeing the old rows.

use std::cell::RefCell;

use crate::bits::Bitmap;
use crate::column::Column;
use crate::error::{Error, ErrorCode, Result};
use crate::item::Item;
use crate::seq::{SeqKind, Sequence};
use crate::settable::{own_settable, set_cell};
use crate::view::{compat, int_col_meta, View};
use crate::virt;

#[derive(Debug, Clone)]
pub struct MutRange {
    pub start: usize,
    pub shift: usize,
    pub added: Option<View>,
}

#[derive(Debug, Clone)]
pub struct MutState {
    parent: View,
    ranges: Vec<MutRange>,
}

impl MutState {
    fn new(parent: View) -> Self {
        let rows = parent.size();
        let mut ranges = vec![MutRange {
            start: 0,
            shift: 0,
            added: None,
        }];
        if rows > 0 {
            ranges.push(MutRange {
                start: rows,
                shift: 0,
                added: None,
            });
        }
        Self { parent, ranges }
    }

    pub fn parent(&self) -> &View {
        &self.parent
    }

    pub fn ranges(&self) -> &[MutRange] {
        &self.ranges
    }

    /// Range holding row `pos` (the sentinel for `pos == rows`).
    fn slot(&self, pos: usize) -> usize {
        self.ranges.partition_point(|r| r.start <= pos).saturating_sub(1)
    }

    pub fn get(&self, row: usize, pos: usize) -> Item {
        let range = &self.ranges[self.slot(row)];
        let index = row - range.start + range.shift;
        match &range.added {
            Some(v) => v.get(index, pos),
            None => self.parent.get(index, pos),
        }
    }

    /// Replace rows `offset..offset+count` by the `drows` rows of `data`.
    fn splice(&mut self, offset: usize, count: usize, data: Option<View>, drows: usize) {
        let fend = offset + count;
        let tend = offset + drows;

        let fslot = self.slot(offset);
        let fpos = offset - self.ranges[fslot].start;
        let tslot = self.slot(fend);
        let tpos = fend - self.ranges[tslot].start;
        let tailv = self.ranges[tslot].added.clone();
        let tail_shift = self.ranges[tslot].shift;

        let head = if fpos > 0 { fslot + 1 } else { fslot };
        let mut segment = Vec::with_capacity(2);
        if let Some(added) = data.filter(|_| drows > 0) {
            segment.push(MutRange {
                start: offset,
                shift: 0,
                added: Some(added),
            });
        }

        let next = if head > tslot {
            // both ends inside one range: split it around the new rows
            segment.push(MutRange {
                start: tend,
                shift: tail_shift + tpos,
                added: tailv,
            });
            let n = segment.len();
            self.ranges.splice(head..head, segment);
            head + n
        } else {
            if tpos > 0 {
                self.ranges[tslot].start = tend;
                self.ranges[tslot].shift += tpos;
            }
            let n = segment.len();
            self.ranges.splice(head..tslot, segment);
            head + n + (tpos > 0) as usize
        };

        for r in &mut self.ranges[next..] {
            r.start = r.start + drows - count;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(offset, count, drows, ranges = self.ranges.len(), "range splice");
    }
}

/// Wrap `view` in a mutable overlay with no changes yet.
pub fn mutable(view: View) -> View {
    let rows = view.size();
    let meta = view.meta();
    #[cfg(feature = "tracing")]
    tracing::trace!(rows, width = view.width(), "mutable promotion");
    View::indirect(
        &meta,
        Sequence::new(rows, SeqKind::Mutable(RefCell::new(MutState::new(view)))),
    )
}

fn own_mutable(view: View) -> View {
    if !view.is_mutable() {
        return mutable(view);
    }
    if view.is_unique() {
        return view;
    }
    match view.first_seq().map(|s| s.kind()) {
        Some(SeqKind::Mutable(state)) => {
            let state = state.borrow().clone();
            View::indirect(
                &view.meta(),
                Sequence::new(view.size(), SeqKind::Mutable(RefCell::new(state))),
            )
        }
        _ => mutable(view),
    }
}

fn with_state<R>(view: &View, f: impl FnOnce(&mut MutState) -> R) -> Result<R> {
    match view.first_seq().map(|s| s.kind()) {
        Some(SeqKind::Mutable(state)) => Ok(f(&mut state.borrow_mut())),
        _ => Err(Error::NotMutable),
    }
}

impl View {
    /// Replace `count` rows at `offset` with the rows of `data`. Returns the
    /// (mutable) result; a no-op returns the view unchanged.
    pub fn replace(self, offset: usize, count: usize, data: Option<&View>) -> Result<View> {
        let drows = data.map_or(0, View::size);
        if let Some(d) = data.filter(|_| drows > 0) {
            if !compat(&self, d) {
                return Err(Error::Incompatible(format!(
                    "{} vs {}",
                    self.describe(),
                    d.describe()
                )));
            }
        }
        if drows == 0 && count == 0 {
            return Ok(self);
        }
        let rows = self.size();
        if offset.checked_add(count).map_or(true, |end| end > rows) {
            return Err(ErrorCode::RowOutOfRange.into());
        }

        let view = own_mutable(self);
        with_state(&view, |st| st.splice(offset, count, data.cloned(), drows))?;
        if let Some(seq) = view.first_seq() {
            seq.set_len(rows + drows - count);
        }
        Ok(view)
    }

    pub fn insert(self, pos: usize, data: &View) -> Result<View> {
        self.replace(pos, 0, Some(data))
    }

    pub fn delete(self, pos: usize, count: usize) -> Result<View> {
        self.replace(pos, count, None)
    }

    pub fn append(self, data: &View) -> Result<View> {
        let end = self.size();
        self.replace(end, 0, Some(data))
    }

    /// Set one cell. The item is converted to the column type first.
    pub fn set(self, row: usize, col: usize, item: &Item) -> Result<View> {
        if row >= self.size() {
            return Err(ErrorCode::RowOutOfRange.into());
        }
        if col >= self.width() {
            return Err(ErrorCode::ColumnOutOfRange.into());
        }
        let ty = self.col_type(col);
        let item = item.convert(ty).ok_or(Error::Type {
            expected: ty,
            got: item.item_type(),
        })?;

        let view = own_mutable(self);
        with_state(&view, |st| {
            let slot = st.slot(row);
            let index = row - st.ranges[slot].start + st.ranges[slot].shift;
            let target = match &mut st.ranges[slot].added {
                Some(v) => v,
                None => &mut st.parent,
            };
            let owned = own_settable(std::mem::replace(target, View::no_columns(0)));
            set_cell(&owned, index, col, item);
            *target = owned;
        })?;
        Ok(view)
    }

    /// Set every column of one row.
    pub fn set_row(self, row: usize, items: &[Item]) -> Result<View> {
        if items.len() != self.width() {
            return Err(ErrorCode::WrongArgCount.into());
        }
        items
            .iter()
            .enumerate()
            .try_fold(self, |view, (col, item)| view.set(row, col, item))
    }
}

/// Change summary of a mutable view relative to its parent.
#[derive(Debug, Clone)]
pub struct MutInfo {
    /// Parent rows that were deleted.
    pub delmap: Bitmap,
    /// Result rows that were inserted.
    pub insmap: Bitmap,
    /// The inserted rows, in order.
    pub insdat: View,
    /// Surviving parent rows (renumbered) with changed cells.
    pub adjmap: Bitmap,
    /// Current values of the adjusted rows.
    pub adjdat: View,
    /// Per adjusted row, one int column per parent column: 1 if changed.
    pub usemap: View,
    /// Dense override index of each adjusted row.
    pub revmap: Vec<i32>,
}

/// Summarize what changed in a mutable view.
pub fn prepare(view: &View) -> Result<MutInfo> {
    let seq = view.first_seq().ok_or(Error::NotMutable)?;
    let state = match seq.kind() {
        SeqKind::Mutable(state) => state.borrow(),
        _ => return Err(Error::NotMutable),
    };
    let parent = &state.parent;
    let parows = parent.size();
    let ranges = &state.ranges;
    let spans = ranges.windows(2).map(|w| (&w[0], w[1].start - w[0].start));

    let mut delmap = Bitmap::new(parows);
    let mut insmap = Bitmap::new(view.size());
    let mut insdat = view.clone_empty();
    let (mut delpos, mut delcnt) = (0, 0);

    for (r, count) in spans.clone() {
        match &r.added {
            None => {
                delcnt += r.shift - delpos;
                delmap.set_range(delpos, r.shift - delpos);
                delpos = r.shift + count;
            }
            Some(added) => {
                let rows = virt::step(added, count, r.shift as i64, 1, 1);
                insdat = virt::concat(&insdat, &rows)?;
                insmap.set_range(r.start, count);
            }
        }
    }
    delcnt += parows - delpos;
    delmap.set_range(delpos, parows - delpos);

    let mut adjmap = Bitmap::new(parows - delcnt);
    let mut revmap = Vec::new();
    let (adjdat, usemap) = match parent.first_seq().map(|s| s.kind()) {
        Some(SeqKind::Settable(set)) => {
            let set = set.borrow();
            let mut rowmap = Vec::new();
            let mut adjpos = 0;
            for (r, count) in spans.filter(|(r, _)| r.added.is_none()) {
                for j in 0..count {
                    if let Some(index) = set.dense(r.shift + j) {
                        revmap.push(index as i32);
                        rowmap.push((r.shift + j) as i32);
                        adjmap.set(adjpos + j);
                    }
                }
                adjpos += count;
            }

            let adjdat = virt::remap(parent, &Column::from_ints(rowmap));
            let width = parent.width();
            let bitmeta = virt::step(&int_col_meta("_"), 1, 0, width, 1);
            let cols = (0..width)
                .map(|c| {
                    let mut bits = set.used(c).cloned().unwrap_or_default();
                    bits.min_len(set.filled());
                    Column::from_bits(bits)
                })
                .collect();
            let bitview = View::new(&bitmeta, cols)?;
            let usemap = virt::remap(&bitview, &Column::from_ints(revmap.clone()));
            (adjdat, usemap)
        }
        _ => (View::no_columns(0), View::no_columns(0)),
    };

    Ok(MutInfo {
        delmap,
        insmap,
        insdat,
        adjmap,
        adjdat,
        usemap,
        revmap,
    })
}

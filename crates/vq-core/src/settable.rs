//! Settable overlay: per-cell overrides on top of an immutable view.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::bits::Bitmap;
use crate::item::Item;
use crate::seq::{SeqKind, Sequence};
use crate::view::View;

/// Overrides for a parent view. Each overridden row gets a dense index in
/// the order it was first touched; per column, `used` says which dense
/// slots actually hold a value.
#[derive(Debug, Clone)]
pub struct SetState {
    view: View,
    rows: Bitmap,
    index: HashMap<usize, usize>,
    data: Vec<Vec<Item>>,
    used: Vec<Bitmap>,
}

impl SetState {
    pub fn new(view: View) -> Self {
        let width = view.width();
        Self {
            view,
            rows: Bitmap::default(),
            index: HashMap::new(),
            data: vec![Vec::new(); width],
            used: vec![Bitmap::default(); width],
        }
    }

    pub fn parent(&self) -> &View {
        &self.view
    }

    /// Bitmap of rows with at least one override.
    pub fn rows(&self) -> &Bitmap {
        &self.rows
    }

    /// Dense index of an overridden row.
    pub fn dense(&self, row: usize) -> Option<usize> {
        if self.rows.test(row) {
            self.index.get(&row).copied()
        } else {
            None
        }
    }

    /// Number of dense slots handed out.
    pub fn filled(&self) -> usize {
        self.index.len()
    }

    pub fn used(&self, col: usize) -> Option<&Bitmap> {
        self.used.get(col)
    }

    pub fn get(&self, row: usize, col: usize) -> Item {
        if let Some(i) = self.dense(row) {
            if self.used.get(col).map_or(false, |u| u.test(i)) {
                if let Some(item) = self.data[col].get(i) {
                    return item.clone();
                }
            }
        }
        self.view.get(row, col)
    }

    /// Store `item` for `(row, col)`; the item must already have the
    /// column's type.
    pub fn set(&mut self, row: usize, col: usize, item: Item) {
        let index = if self.rows.set(row) {
            let i = self.index.len();
            self.index.insert(row, i);
            i
        } else {
            self.index.get(&row).copied().unwrap_or(0)
        };
        self.used[col].set(index);
        let data = &mut self.data[col];
        if data.len() <= index {
            data.resize(index + 1, Item::Unknown);
        }
        data[index] = item;
    }
}

/// Wrap `view` in an empty settable overlay.
pub fn settable(view: View) -> View {
    let rows = view.size();
    let meta = view.meta();
    #[cfg(feature = "tracing")]
    tracing::trace!(rows, width = view.width(), "settable promotion");
    let seq = Sequence::new(rows, SeqKind::Settable(RefCell::new(SetState::new(view))));
    View::indirect(&meta, seq)
}

/// A settable view that nothing else refers to: `view` itself when it
/// already is one and is uniquely held, otherwise a fresh overlay (with a
/// copy of any existing overrides).
pub(crate) fn own_settable(view: View) -> View {
    if !view.is_settable() {
        return settable(view);
    }
    if view.is_unique() {
        return view;
    }
    let state = match view.first_seq().map(|s| s.kind()) {
        Some(SeqKind::Settable(state)) => state.borrow().clone(),
        _ => return settable(view),
    };
    let seq = Sequence::new(view.size(), SeqKind::Settable(RefCell::new(state)));
    View::indirect(&view.meta(), seq)
}

/// Set one cell of a view obtained from `own_settable`.
pub(crate) fn set_cell(view: &View, row: usize, col: usize, item: Item) {
    if let Some(SeqKind::Settable(state)) = view.first_seq().map(|s| s.kind()) {
        state.borrow_mut().set(row, col, item);
    }
}

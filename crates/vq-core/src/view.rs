//! Views: a meta view plus one column per described field.
//!
//! Every view is described by another view with the three columns
//! `name:S,type:S,subv:V`. The meta-meta describes itself; it is recorded as
//! `meta: None` so no view ever holds a reference cycle.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::column::{coerce_items, force_string_column, Column};
use crate::context::{empty_meta, is_meta_meta, meta_meta};
use crate::desc::{describe, parse_desc};
use crate::error::{Error, ErrorCode, Result};
use crate::fingerprint::string_lookup;
use crate::item::{Item, ItemType};
use crate::seq::{SeqKind, Sequence};
use crate::virt;

/// Column positions inside a meta view.
pub const MC_NAME: usize = 0;
pub const MC_TYPE: usize = 1;
pub const MC_SUBV: usize = 2;

pub struct ViewData {
    meta: Option<View>,
    types: Vec<ItemType>,
    cols: Vec<Column>,
}

impl ViewData {
    pub(crate) fn new(meta: Option<View>, types: Vec<ItemType>, cols: Vec<Column>) -> Self {
        Self { meta, types, cols }
    }
}

#[derive(Clone)]
pub struct View(Rc<ViewData>);

impl View {
    pub(crate) fn from_data(data: ViewData) -> View {
        View(Rc::new(data))
    }

    pub(crate) fn data(&self) -> &Rc<ViewData> {
        &self.0
    }

    /// Build a view from its meta and columns. `cols` must hold one column
    /// per meta row; a zero-width meta takes either no column or a single
    /// column that only supplies the row count.
    pub fn new(meta: &View, cols: Vec<Column>) -> Result<View> {
        let width = meta.size();
        let cols = match (width, cols.len()) {
            (0, 0) => vec![Column::zeros(0)],
            (0, 1) => cols,
            (w, n) if w == n => cols,
            _ => return Err(ErrorCode::ColumnOutOfRange.into()),
        };
        Ok(View::assemble(meta, cols))
    }

    /// Build a view over a single sequence serving every column.
    pub fn indirect(meta: &View, seq: Rc<Sequence>) -> View {
        let width = meta.size();
        let cols = if width == 0 {
            vec![Column::new(seq)]
        } else {
            (0..width).map(|pos| Column::with_pos(Rc::clone(&seq), pos)).collect()
        };
        View::assemble(meta, cols)
    }

    /// View without columns but with `rows` rows.
    pub fn no_columns(rows: usize) -> View {
        View::assemble(&empty_meta(), vec![Column::zeros(rows)])
    }

    /// Build a view from a description and matching columns.
    pub fn with_desc(desc: &str, cols: Vec<Column>) -> Result<View> {
        View::new(&parse_desc(desc)?, cols)
    }

    /// Build a view from one column per meta row, converting each column
    /// to its declared type.
    pub fn from_columns(meta: &View, cols: Vec<Column>) -> Result<View> {
        if cols.len() != meta.size() {
            return Err(ErrorCode::WrongArgCount.into());
        }
        let types = meta_types(meta);
        let cols = cols
            .iter()
            .zip(types)
            .map(|(col, ty)| coerce_items(ty, col))
            .collect::<Result<Vec<_>>>()?;
        View::new(meta, cols)
    }

    /// Build a view from row-major items.
    pub fn from_items(meta: &View, items: &[Item]) -> Result<View> {
        let width = meta.size();
        if width == 0 {
            if items.is_empty() {
                return Ok(View::no_columns(0));
            }
            return Err(ErrorCode::ZeroWidthInsert.into());
        }
        if items.len() % width != 0 {
            return Err(ErrorCode::NotMultipleOfWidth.into());
        }
        let rows = items.len() / width;
        let cols = meta_types(meta)
            .into_iter()
            .enumerate()
            .map(|(c, ty)| {
                let values = (0..rows)
                    .map(|r| {
                        items[r * width + c]
                            .convert(ty)
                            .ok_or(Error::Coerce { row: r, ty })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Column::from_items(ty, values)
            })
            .collect::<Result<Vec<_>>>()?;
        View::new(meta, cols)
    }

    fn assemble(meta: &View, cols: Vec<Column>) -> View {
        let meta = with_string_names(meta);
        let types = meta_types(&meta);
        let meta = if is_meta_meta(&meta) { None } else { Some(meta) };
        View::from_data(ViewData::new(meta, types, cols))
    }

    pub fn ptr_eq(a: &View, b: &View) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn meta(&self) -> View {
        match &self.0.meta {
            Some(m) => m.clone(),
            None => meta_meta(),
        }
    }

    pub fn size(&self) -> usize {
        self.0.cols.first().map_or(0, Column::len)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn width(&self) -> usize {
        self.0.types.len()
    }

    pub fn types(&self) -> &[ItemType] {
        &self.0.types
    }

    pub fn col_type(&self, col: usize) -> ItemType {
        self.0.types.get(col).copied().unwrap_or(ItemType::Unknown)
    }

    pub fn column(&self, col: usize) -> Option<&Column> {
        if col < self.width() {
            self.0.cols.get(col)
        } else {
            None
        }
    }

    /// The sequence behind column 0 (the row counter for zero-width views).
    pub fn first_seq(&self) -> Option<&Rc<Sequence>> {
        self.0.cols.first().map(Column::seq)
    }

    pub fn get(&self, row: usize, col: usize) -> Item {
        match self.column(col) {
            Some(c) => c.get(row),
            None => Item::Error(ErrorCode::ColumnOutOfRange),
        }
    }

    /// All items of one row.
    pub fn row(&self, row: usize) -> Vec<Item> {
        (0..self.width()).map(|c| self.get(row, c)).collect()
    }

    pub fn names(&self) -> Vec<String> {
        let meta = self.meta();
        (0..meta.size())
            .map(|r| meta.get(r, MC_NAME).as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Sub-meta of column `col` (the empty meta unless it is a view column).
    pub fn submeta(&self, col: usize) -> View {
        submeta_row(&self.meta(), col)
    }

    /// Empty view with this view's structure.
    pub fn clone_empty(&self) -> View {
        if self.width() == 0 {
            return View::no_columns(0);
        }
        let cols = self.0.types.iter().map(|ty| Column::empty(*ty)).collect();
        View::assemble(&self.meta(), cols)
    }

    /// Columns picked (and possibly repeated) by index.
    pub fn col_map(&self, map: &Column) -> Result<View> {
        if map.is_empty() {
            return Ok(View::no_columns(self.size()));
        }
        let cols = (0..map.len())
            .map(|i| {
                usize::try_from(map.int(i))
                    .ok()
                    .and_then(|c| self.column(c).cloned())
                    .ok_or(Error::Code(ErrorCode::ColumnOutOfRange))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(View::assemble(&virt::remap(&self.meta(), map), cols))
    }

    /// Every column except the listed ones.
    pub fn col_omit(&self, omit: &Column) -> Result<View> {
        self.col_map(&Column::omit(omit, self.width()))
    }

    pub fn one_col(&self, col: usize) -> Result<View> {
        let column = self.column(col).cloned().ok_or(ErrorCode::ColumnOutOfRange)?;
        let meta = virt::step(&self.meta(), 1, col as i64, 1, 1);
        Ok(View::assemble(&meta, vec![column]))
    }

    pub fn first(&self, count: usize) -> View {
        if count >= self.size() {
            return self.clone();
        }
        virt::step(self, count, 0, 1, 1)
    }

    pub fn last(&self, count: usize) -> View {
        let rows = self.size();
        if count >= rows {
            return self.clone();
        }
        virt::step(self, count, (rows - count) as i64, 1, 1)
    }

    /// First `count` rows, wrapping around; a negative count takes rows
    /// from the end in reverse order.
    pub fn take(&self, count: i64) -> View {
        if count >= 0 {
            virt::step(self, count as usize, 0, 1, 1)
        } else {
            virt::step(self, count.unsigned_abs() as usize, -1, 1, -1)
        }
    }

    /// Columns of both views side by side, truncated to the shorter one.
    pub fn pair(&self, other: &View) -> View {
        let (rows1, rows2) = (self.size(), other.size());
        let (left, right) = if rows2 < rows1 {
            (self.first(rows2), other.clone())
        } else if rows1 < rows2 {
            (self.clone(), other.first(rows1))
        } else if other.width() == 0 {
            return self.clone();
        } else if self.width() == 0 {
            return other.clone();
        } else {
            (self.clone(), other.clone())
        };

        if left.width() + right.width() == 0 {
            return View::no_columns(left.size());
        }
        let meta = virt::concat_unchecked(&left.meta(), &right.meta());
        let cols = left.0.cols[..left.width()]
            .iter()
            .chain(right.0.cols[..right.width()].iter())
            .cloned()
            .collect();
        View::assemble(&meta, cols)
    }

    /// Append an int column `name` holding the row numbers.
    pub fn tag(&self, name: &str) -> View {
        let tags = View::assemble(&int_col_meta(name), vec![Column::iota(self.size())]);
        self.pair(&tags)
    }

    pub fn col_by_name(&self, name: &str) -> Option<usize> {
        let meta = self.meta();
        meta.column(MC_NAME).and_then(|names| string_lookup(name, names))
    }

    /// Rename columns; `pairs` alternates old and new names.
    pub fn rename(&self, pairs: &[&str]) -> Result<View> {
        if pairs.len() % 2 != 0 {
            return Err(ErrorCode::RenameArgCount.into());
        }
        let mut names = self.names();
        for pair in pairs.chunks(2) {
            let col = self
                .col_by_name(pair[0])
                .ok_or_else(|| Error::NoSuchColumn(pair[0].to_string()))?;
            names[col] = pair[1].to_string();
        }
        let meta = self.meta();
        let cols = vec![
            Column::from_strs(&names),
            meta.0.cols[MC_TYPE].clone(),
            meta.0.cols[MC_SUBV].clone(),
        ];
        let renamed = View::new(&meta.meta(), cols)?;
        View::new(&renamed, self.0.cols.clone())
    }

    pub fn describe(&self) -> String {
        describe(&self.meta())
    }

    pub fn structure(&self) -> String {
        crate::desc::structure(&self.meta())
    }

    pub fn is_mutable(&self) -> bool {
        self.first_seq()
            .map_or(false, |s| matches!(s.kind(), SeqKind::Mutable(_)))
    }

    pub fn is_settable(&self) -> bool {
        self.first_seq()
            .map_or(false, |s| matches!(s.kind(), SeqKind::Settable(_)))
    }

    /// True when nothing else holds this view or its shared sequence, so
    /// overlays may be changed in place without affecting other handles.
    pub(crate) fn is_unique(&self) -> bool {
        Rc::strong_count(&self.0) == 1
            && self
                .first_seq()
                .map_or(false, |s| Rc::strong_count(s) == self.0.cols.len())
    }
}

/// Meta with a single int column.
pub fn int_col_meta(name: &str) -> View {
    make_meta(&[(name, ItemType::Int, empty_meta())])
}

/// Meta view from `(name, type, submeta)` entries.
pub fn make_meta(entries: &[(&str, ItemType, View)]) -> View {
    let cols = vec![
        Column::from_strs(entries.iter().map(|e| e.0)),
        Column::from_strs(entries.iter().map(|e| e.1.code())),
        Column::from_views(entries.iter().map(|e| e.2.clone()).collect()),
    ];
    View::assemble(&meta_meta(), cols)
}

/// Column types declared by a meta view.
pub fn meta_types(meta: &View) -> Vec<ItemType> {
    (0..meta.size())
        .map(|r| match meta.get(r, MC_TYPE) {
            Item::Str(s) => s.bytes().next().map_or(ItemType::Unknown, ItemType::from_code),
            _ => ItemType::Unknown,
        })
        .collect()
}

fn with_string_names(meta: &View) -> View {
    match meta.0.cols.first() {
        Some(names) if !matches!(names.seq().kind(), SeqKind::Strings(_)) && meta.width() == 3 => {
            let mut cols = meta.0.cols.clone();
            cols[MC_NAME] = force_string_column(names);
            View::from_data(ViewData::new(meta.0.meta.clone(), meta.0.types.clone(), cols))
        }
        _ => meta.clone(),
    }
}

/// Structural compatibility of two metas: same column count, same type
/// codes, compatible sub-metas. Names are not compared.
pub fn meta_compat(m1: &View, m2: &View) -> bool {
    if View::ptr_eq(m1, m2) {
        return true;
    }
    let cols = m1.size();
    if cols != m2.size() {
        return false;
    }
    let (t1, t2) = (meta_types(m1), meta_types(m2));
    (0..cols).all(|c| {
        t1[c] == t2[c]
            && (t1[c] != ItemType::View || meta_compat(&submeta_row(m1, c), &submeta_row(m2, c)))
    })
}

/// Sub-meta declared in row `row` of a meta view.
pub fn submeta_row(meta: &View, row: usize) -> View {
    meta.get(row, MC_SUBV).into_view().unwrap_or_else(empty_meta)
}

pub fn compat(v1: &View, v2: &View) -> bool {
    View::ptr_eq(v1, v2) || meta_compat(&v1.meta(), &v2.meta())
}

/// Order two items of the same type. Numbers compare by value, strings and
/// bytes lexicographically (a shorter prefix first), views recursively.
pub fn item_compare(a: &Item, b: &Item) -> Ordering {
    match (a, b) {
        (Item::Int(x), Item::Int(y)) => x.cmp(y),
        (Item::Wide(x), Item::Wide(y)) => x.cmp(y),
        (Item::Float(x), Item::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Item::Double(x), Item::Double(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Item::Str(x), Item::Str(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Item::Bytes(x), Item::Bytes(y)) => x.as_slice().cmp(y.as_slice()),
        (Item::View(x), Item::View(y)) => view_compare(x, y),
        _ => Ordering::Equal,
    }
}

/// Column-wise row comparison, using the columns of `v1`.
pub fn row_compare(v1: &View, r1: usize, v2: &View, r2: usize) -> Ordering {
    for c in 0..v1.width() {
        let f = item_compare(&v1.get(r1, c), &v2.get(r2, c));
        if f != Ordering::Equal {
            return f;
        }
    }
    Ordering::Equal
}

pub fn row_equal(v1: &View, r1: usize, v2: &View, r2: usize) -> bool {
    row_compare(v1, r1, v2, r2) == Ordering::Equal
}

/// Total order on views: identity, then metas, then rows; a view which is
/// a prefix of another sorts first.
pub fn view_compare(v1: &View, v2: &View) -> Ordering {
    if View::ptr_eq(v1, v2) {
        return Ordering::Equal;
    }
    let (m1, m2) = (v1.meta(), v2.meta());
    if !(View::ptr_eq(&m1, v1) && View::ptr_eq(&m2, v2)) {
        let f = view_compare(&m1, &m2);
        if f != Ordering::Equal {
            return f;
        }
    }
    let (rows1, rows2) = (v1.size(), v2.size());
    for r in 0..rows1.min(rows2) {
        let f = row_compare(v1, r, v2, r);
        if f != Ordering::Equal {
            return f;
        }
    }
    rows1.cmp(&rows2)
}

impl PartialEq for Item {
    fn eq(&self, other: &Item) -> bool {
        match (self, other) {
            (Item::Unknown, Item::Unknown) => true,
            (Item::Error(a), Item::Error(b)) => a == b,
            (a, b) => a.item_type() == b.item_type() && item_compare(a, b) == Ordering::Equal,
        }
    }
}

impl PartialEq for View {
    fn eq(&self, other: &View) -> bool {
        view_compare(self, other) == Ordering::Equal
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "View({} #{})", self.describe(), self.size())
    }
}

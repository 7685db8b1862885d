//! Views over serialized bytes.
//!
//! Columns are built lazily on top of a shared `Region`: fixed-width
//! vectors decode in place, string columns keep `(offset, len)` spans,
//! and sub-view columns map each nested view on first access.

use std::fmt;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use vq_core::context::empty_meta;
use vq_core::desc::parse_desc;
use vq_core::vector::Getter;
use vq_core::view::{meta_types, submeta_row};
use vq_core::virt::step;
use vq_core::{
    Bitmap, Column, ErrorCode, ItemType, Region, SeqKind, Sequence, SubviewSource, View,
};

use crate::emit::ELIAS_MIN_ROWS;
use crate::error::{Error, Result};
use crate::varint::Cursor;

const TAIL: usize = 16;

/// The data area of a saved view.
#[derive(Debug)]
struct Mapped {
    region: Region,
    /// Written on a host of the other byte order.
    reversed: bool,
}

/// Location of the root view and the kind of save.
struct Trailer {
    start: usize,
    root: usize,
    diff: bool,
}

fn be32(bytes: &[u8], at: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&bytes[at..at + 4]);
    u32::from_be_bytes(b)
}

fn read_trailer(bytes: &[u8]) -> Result<Trailer> {
    let len = bytes.len();
    if len <= 24 || bytes[len - TAIL] != 0x80 {
        return Err(Error::format("missing view trailer"));
    }
    let t: Vec<u32> = (0..4).map(|i| be32(bytes, len - TAIL + 4 * i)).collect();
    let mut datalen = u64::from(t[1]) + TAIL as u64;
    let mut root = u64::from(t[3]);
    if root & 0x8000_0000 != 0 {
        let mask = 0x7FFF_FFFFu64;
        datalen = (datalen & mask) + (u64::from(t[0] & 0x7FF) << 31);
        root = (root & mask) + (datalen & !mask);
        if root > datalen {
            root = root
                .checked_sub(1 << 31)
                .ok_or_else(|| Error::format("bad root offset"))?;
        }
    }
    let datalen = usize::try_from(datalen).map_err(|_| Error::format("file too large"))?;
    if datalen > len {
        return Err(Error::format(format!("trailer claims {} bytes, have {}", datalen, len)));
    }
    Ok(Trailer {
        start: len - datalen,
        root: root as usize,
        diff: t[2] >> 24 == 0x90,
    })
}

impl Mapped {
    fn bytes(&self) -> &[u8] {
        self.region.bytes()
    }

    fn cursor(&self, pos: usize) -> Cursor<'_> {
        Cursor::new(self.bytes(), pos)
    }

    fn check(&self, offset: usize, size: usize) -> Result<()> {
        match offset.checked_add(size) {
            Some(end) if end <= self.region.len() => Ok(()),
            _ => Err(Error::format(format!("block {}+{} out of bounds", offset, size))),
        }
    }

    /// A fixed-width column, or a run-coded bitmap when the block is far
    /// too small for one bit per row.
    fn fixed_col(&self, cur: &mut Cursor<'_>, rows: usize, real: bool) -> Result<Column> {
        let (size, offset) = cur.pair()?;
        self.check(offset, size)?;
        if rows >= ELIAS_MIN_ROWS && size > 0 && size < rows / 8 {
            let bits = Bitmap::from_elias(&self.bytes()[offset..offset + size], rows);
            return Ok(Column::from_bits(bits));
        }
        let getter = Getter::fixed(size, rows, real, self.reversed)
            .ok_or_else(|| Error::format(format!("no layout for {} rows in {} bytes", rows, size)))?;
        let region = self
            .region
            .slice(offset, size)
            .ok_or_else(|| Error::format("fixed column out of bounds"))?;
        Ok(Column::new(Sequence::new(rows, SeqKind::Fixed { region, getter })))
    }

    /// A bitmap of `rows` bits; `None` for an empty block.
    fn bits(&self, cur: &mut Cursor<'_>, rows: usize) -> Result<Option<Bitmap>> {
        if cur.peek() == Some(0x80) {
            cur.skip(1)?;
            return Ok(None);
        }
        let col = self.fixed_col(cur, rows, false)?;
        let mut bits = Bitmap::new(rows);
        for r in 0..rows {
            if col.int(r) != 0 {
                bits.set(r);
            }
        }
        Ok(Some(bits))
    }

    fn text_span(&self, offset: usize, len: usize, text: bool) -> (usize, usize) {
        if text && len > 0 && self.bytes().get(offset + len - 1) == Some(&0) {
            (offset, len - 1)
        } else {
            (offset, len)
        }
    }

    fn string_col(&self, cur: &mut Cursor<'_>, rows: usize, text: bool) -> Result<Column> {
        let mut spans = vec![(0, 0); rows];
        let (size, mut offset) = cur.pair()?;
        self.check(offset, size)?;
        if size > 0 {
            let sizes = self.fixed_col(cur, rows, false)?;
            for (r, span) in spans.iter_mut().enumerate() {
                let len = usize::try_from(sizes.int(r)).unwrap_or(0);
                if len > 0 {
                    self.check(offset, len)?;
                    *span = self.text_span(offset, len, text);
                    offset += len;
                }
            }
        }

        // memo entries: a row skip, then a pair locating that row's data
        let (msize, mpos) = cur.pair()?;
        self.check(mpos, msize)?;
        let mut memo = self.cursor(mpos);
        let mut r = 0;
        while memo.pos() < mpos + msize {
            r += memo.usize()?;
            let (len, mut at) = memo.pair()?;
            if len > 0 && at == 0 {
                at = memo.pos();
                memo.skip(len)?;
            }
            self.check(at, len)?;
            let span = spans
                .get_mut(r)
                .ok_or_else(|| Error::format(format!("memo row {} out of range", r)))?;
            *span = self.text_span(at, len, text);
            r += 1;
        }

        let kind = SeqKind::MappedStr {
            region: self.region.clone(),
            spans,
            text,
        };
        Ok(Column::new(Sequence::new(rows, kind)))
    }

    /// Skip over one serialized full view.
    fn skip_view(&self, cur: &mut Cursor<'_>, meta: &View) -> Result<()> {
        cur.varint()?;
        let meta = if meta.size() == 0 {
            read_desc(cur)?
        } else {
            meta.clone()
        };
        if cur.varint()? > 0 {
            for ty in meta_types(&meta) {
                if matches!(ty, ItemType::Str | ItemType::Bytes) && cur.skip_pair()? > 0 {
                    cur.skip_pair()?;
                }
                cur.skip_pair()?;
            }
        }
        Ok(())
    }

    fn view_col(self: &Rc<Self>, cur: &mut Cursor<'_>, rows: usize, meta: View) -> Result<Column> {
        let (size, offset) = cur.pair()?;
        self.check(offset, size)?;
        let mut next = self.cursor(offset);
        let mut offsets = Vec::with_capacity(rows);
        for _ in 0..rows {
            offsets.push(next.pos());
            self.skip_view(&mut next, &meta)?;
        }
        let source = Subviews {
            file: Rc::clone(self),
            offsets,
            meta,
        };
        let kind = SeqKind::MappedViews {
            source: Rc::new(source),
            cache: (0..rows).map(|_| OnceCell::new()).collect(),
        };
        Ok(Column::new(Sequence::new(rows, kind)))
    }

    /// Columns of one view. With a `base`, only the rows flagged in `adjust`
    /// are read, and each column carries its own bitmap of changed cells.
    fn cols(
        self: &Rc<Self>,
        cur: &mut Cursor<'_>,
        meta: &View,
        base: Option<View>,
        adjust: Option<&Bitmap>,
    ) -> Result<View> {
        let rows = cur.usize()?;
        if meta.size() == 0 {
            return Ok(base.unwrap_or_else(|| View::no_columns(rows)));
        }
        let rowmap: Vec<usize> = adjust
            .map(|bits| bits.runs().flat_map(|(from, n)| from..from + n).collect())
            .unwrap_or_default();

        let mut result = base;
        let mut cols = Vec::new();
        for (c, ty) in meta_types(meta).into_iter().enumerate() {
            let (used, count) = match &result {
                Some(_) if rows > 0 => match self.bits(cur, rows)? {
                    Some(used) => {
                        let count = used.count_ones();
                        (Some(used), count)
                    }
                    None => continue,
                },
                _ => (None, rows),
            };
            let column = if rows == 0 {
                Column::empty(ty)
            } else {
                match ty {
                    ItemType::Int | ItemType::Wide => self.fixed_col(cur, count, false)?,
                    ItemType::Float | ItemType::Double => self.fixed_col(cur, count, true)?,
                    ItemType::Str => self.string_col(cur, count, true)?,
                    ItemType::Bytes => self.string_col(cur, count, false)?,
                    ItemType::View => self.view_col(cur, count, submeta_row(meta, c))?,
                    ty => return Err(Error::format(format!("cannot load a column of type {}", ty))),
                }
            };
            match result.take() {
                Some(mut view) => {
                    let mut i = 0;
                    for r in used.iter().flat_map(|u| u.runs().flat_map(|(f, n)| f..f + n)) {
                        let row = *rowmap
                            .get(r)
                            .ok_or_else(|| Error::format("adjusted cell outside adjusted rows"))?;
                        view = view.set(row, c, &column.get(i))?;
                        i += 1;
                    }
                    result = Some(view);
                }
                None => cols.push(column),
            }
        }
        match result {
            Some(view) => Ok(view),
            None => Ok(View::new(meta, cols)?),
        }
    }

    /// The view serialized at `offset`, in full or, with a `base`, as the
    /// changes to apply to it.
    fn view_at(self: &Rc<Self>, offset: usize, meta: &View, base: Option<View>) -> Result<View> {
        let mut cur = self.cursor(offset);
        cur.varint()?;

        if let Some(mut base) = base {
            let meta = base.meta();
            cur.varint()?;

            if let Some(deleted) = self.bits(&mut cur, base.size())? {
                let mut gone = 0;
                for (from, count) in deleted.runs() {
                    base = base.delete(from - gone, count)?;
                    gone += count;
                }
            }
            if let Some(adjusted) = self.bits(&mut cur, base.size())? {
                base = self.cols(&mut cur, &meta, Some(base), Some(&adjusted))?;
            }
            let inserted = self.cols(&mut cur, &meta, None, None)?;
            let count = inserted.size();
            if count > 0 {
                let places = self
                    .bits(&mut cur, base.size() + count)?
                    .unwrap_or_default();
                let mut shift = 0;
                for (from, n) in places.runs() {
                    let rows = step(&inserted, n, shift as i64, 1, 1);
                    base = base.insert(from, &rows)?;
                    shift += n;
                }
            }
            #[cfg(feature = "tracing")]
            tracing::trace!(rows = base.size(), inserted = count, "diff applied");
            return Ok(base);
        }

        let meta = if meta.size() == 0 {
            read_desc(&mut cur)?
        } else {
            meta.clone()
        };
        self.cols(&mut cur, &meta, None, None)
    }
}

fn read_desc(cur: &mut Cursor<'_>) -> Result<View> {
    let len = cur.usize()?;
    let desc = std::str::from_utf8(cur.bytes(len)?)
        .map_err(|_| Error::format("description is not UTF-8"))?;
    Ok(parse_desc(desc)?)
}

/// Lazily mapped sub-views of one view column.
struct Subviews {
    file: Rc<Mapped>,
    offsets: Vec<usize>,
    meta: View,
}

impl fmt::Debug for Subviews {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subviews({} rows)", self.offsets.len())
    }
}

impl SubviewSource for Subviews {
    fn subview(&self, row: usize) -> std::result::Result<View, ErrorCode> {
        let offset = *self.offsets.get(row).ok_or(ErrorCode::RowOutOfRange)?;
        self.file.view_at(offset, &self.meta, None).map_err(|_e| {
            #[cfg(feature = "tracing")]
            tracing::warn!(row, error = %_e, "cannot map sub-view");
            ErrorCode::BadSubview
        })
    }
}

fn map_region(region: Region, base: Option<View>) -> Result<View> {
    let trailer = read_trailer(region.bytes())?;
    match (&base, trailer.diff) {
        (None, true) => return Err(Error::format("diff save needs a base view")),
        (Some(_), false) => return Err(Error::format("not a diff save")),
        _ => {}
    }
    let region = region
        .tail(trailer.start)
        .ok_or_else(|| Error::format("bad data start"))?;
    let mapped = Rc::new(Mapped {
        reversed: region.bytes().first() == Some(&b'L'),
        region,
    });
    mapped.view_at(trailer.root, &empty_meta(), base)
}

/// View over a saved region (owned bytes or a file mapping).
pub fn load_region(region: Region) -> Result<View> {
    map_region(region, None)
}

pub fn load_bytes(bytes: Vec<u8>) -> Result<View> {
    load_region(Region::new(bytes))
}

/// Replay a diff save on top of `base`, the view it was taken against.
pub fn apply_diff(base: &View, bytes: Vec<u8>) -> Result<View> {
    map_region(Region::new(bytes), Some(base.clone()))
}

pub(crate) fn apply_diff_region(base: &View, region: Region) -> Result<View> {
    map_region(region, Some(base.clone()))
}

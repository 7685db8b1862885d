//! Serializing views.
//!
//! Column data goes out as separate blocks while the view structure
//! (row counts, `(size, offset)` pairs pointing at those blocks, and
//! descriptions) accumulates in a side buffer, written last as the root
//! block. Sub-view columns get a structure buffer of their own, emitted
//! as one more block.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use vq_core::context;
use vq_core::desc::describe;
use vq_core::mutable::prepare;
use vq_core::virt::remap;
use vq_core::{Bitmap, Column, EngineConfig, Item, ItemType, View};

use crate::error::{Error, Result};
use crate::pack::{pack_doubles, pack_floats, pack_ints, pack_wides};
use crate::varint::{put_pair, put_varint};

/// Loaders treat compressed bitmaps as such only from this many rows on.
pub(crate) const ELIAS_MIN_ROWS: usize = 128;

/// Largest file the tail can address (42 bits).
const MAX_FILE: u64 = 1 << 42;

struct Emitter<'a> {
    position: u64,
    blocks: Vec<Vec<u8>>,
    config: &'a EngineConfig,
}

impl<'a> Emitter<'a> {
    fn new(config: &'a EngineConfig) -> Self {
        Self {
            position: 0,
            blocks: Vec::new(),
            config,
        }
    }

    fn block(&mut self, data: Vec<u8>) -> u64 {
        let pos = self.position;
        if !data.is_empty() {
            self.position += data.len() as u64;
            self.blocks.push(data);
        }
        pos
    }

    fn pad_to_16(&mut self) {
        let pad = (16 - (self.position & 15) as usize) & 15;
        self.block(vec![0; pad]);
    }

    fn align(&mut self) {
        if self.position >= self.config.align_threshold {
            self.pad_to_16();
        }
    }

    /// Emit `data` as a block and refer to it from `out`.
    fn data_pair(&mut self, out: &mut Vec<u8>, data: Vec<u8>) {
        let offset = self.block(data);
        put_pair(out, self.position - offset, offset);
    }

    fn fixed_block(&mut self, out: &mut Vec<u8>, data: Vec<u8>, rows: usize) -> bool {
        if data.len() >= self.config.align_min_block && rows > 0 && data.len() / rows >= 2 {
            self.align();
        }
        let nonempty = !data.is_empty();
        self.data_pair(out, data);
        nonempty
    }

    /// Int vector, optionally run coded when it is a long bitmap which
    /// compresses to under 80%.
    fn int_col(&mut self, out: &mut Vec<u8>, values: &[i32], runs: bool) -> bool {
        let rows = values.len();
        let mut data = pack_ints(values);
        if runs
            && rows >= self.config.elias_min_rows.max(ELIAS_MIN_ROWS)
            && rows == data.len() * 8
        {
            let mut bits = Bitmap::new(rows);
            for (i, v) in values.iter().enumerate() {
                if *v != 0 {
                    bits.set(i);
                }
            }
            let (coded, ebits) = bits.to_elias();
            if ebits + ebits / 4 < rows {
                data = coded;
                data.truncate((ebits + 7) / 8);
            }
        }
        self.fixed_block(out, data, rows)
    }

    fn bits_col(&mut self, out: &mut Vec<u8>, bits: &Bitmap) -> bool {
        let values: Vec<i32> = (0..bits.len()).map(|i| bits.test(i) as i32).collect();
        self.int_col(out, &values, true)
    }

    fn fixed_col(&mut self, out: &mut Vec<u8>, col: &Column, ty: ItemType, runs: bool) -> bool {
        let rows = col.len();
        let items = (0..rows).map(|r| col.get(r));
        let data = match ty {
            ItemType::Wide => pack_wides(items.map(|i| match i {
                Item::Wide(v) => v,
                Item::Int(v) => v as i64,
                _ => 0,
            })),
            ItemType::Float => pack_floats(items.map(|i| i.as_float().unwrap_or(0.0))),
            ItemType::Double => pack_doubles(items.map(|i| i.as_double().unwrap_or(0.0))),
            _ => return self.int_col(out, &col.to_ints(), runs),
        };
        self.fixed_block(out, data, rows)
    }

    /// String or bytes column: the data blob, per-row sizes (strings
    /// include their terminating NUL; empty strings take no space), and an
    /// empty memo list.
    fn var_col(&mut self, out: &mut Vec<u8>, col: &Column, text: bool, runs: bool) {
        let rows = col.len();
        let mut data = Vec::new();
        let mut sizes = Vec::with_capacity(rows);
        for r in 0..rows {
            let item = col.get(r);
            let bytes: &[u8] = match &item {
                Item::Str(s) => s.as_bytes(),
                Item::Bytes(b) => b,
                _ => &[],
            };
            if text && !bytes.is_empty() {
                data.extend_from_slice(bytes);
                data.push(0);
                sizes.push(bytes.len() as i32 + 1);
            } else {
                data.extend_from_slice(bytes);
                sizes.push(bytes.len() as i32);
            }
        }
        let nonempty = !data.is_empty();
        self.data_pair(out, data);
        if nonempty {
            self.int_col(out, &sizes, runs);
        }
        put_varint(out, 0);
    }

    /// Sub-views always go out in full, with their own description when
    /// the column does not declare a structure.
    fn sub_col(&mut self, out: &mut Vec<u8>, col: &Column, describe: bool) -> Result<()> {
        let mut inner = Vec::new();
        for r in 0..col.len() {
            let view = col.get(r).into_view().unwrap_or_else(|| View::no_columns(0));
            self.view(&mut inner, &view, describe, false)?;
        }
        self.data_pair(out, inner);
        Ok(())
    }

    fn cols(&mut self, out: &mut Vec<u8>, view: &View, maps: Option<&View>, runs: bool) -> Result<()> {
        let rows = view.size();
        put_varint(out, rows as u64);
        if rows == 0 {
            return Ok(());
        }
        for c in 0..view.width() {
            let source = match maps.and_then(|m| m.column(c)) {
                Some(mapcol) => {
                    let used = mapcol.to_ints();
                    if !self.int_col(out, &used, runs) {
                        continue;
                    }
                    let rowmap = used
                        .iter()
                        .enumerate()
                        .filter(|(_, u)| **u != 0)
                        .map(|(r, _)| r as i32)
                        .collect();
                    remap(view, &Column::from_ints(rowmap))
                }
                None => view.clone(),
            };
            let column = source
                .column(c)
                .ok_or_else(|| Error::format(format!("missing column {}", c)))?;
            match view.col_type(c) {
                ty @ (ItemType::Int | ItemType::Wide | ItemType::Float | ItemType::Double) => {
                    self.fixed_col(out, column, ty, runs);
                }
                ItemType::Str => self.var_col(out, column, true, runs),
                ItemType::Bytes => self.var_col(out, column, false, runs),
                ItemType::View => {
                    let undeclared = view.submeta(c).size() == 0;
                    self.sub_col(out, column, undeclared)?;
                }
                ty => return Err(Error::format(format!("cannot save a column of type {}", ty))),
            }
        }
        Ok(())
    }

    fn view(&mut self, out: &mut Vec<u8>, view: &View, describe_it: bool, diff: bool) -> Result<()> {
        put_varint(out, 0);
        if diff {
            let info = prepare(view)?;
            put_varint(out, 0);
            self.bits_col(out, &info.delmap);
            if self.bits_col(out, &info.adjmap) {
                self.cols(out, &info.adjdat, Some(&info.usemap), true)?;
            }
            self.cols(out, &info.insdat, None, true)?;
            if info.insdat.size() > 0 {
                self.bits_col(out, &info.insmap);
            }
        } else {
            if describe_it {
                let desc = describe(&view.meta());
                put_varint(out, desc.len() as u64);
                out.extend_from_slice(desc.as_bytes());
            }
            self.cols(out, view, None, false)?;
        }
        Ok(())
    }

    fn complete(mut self, view: &View, diff: bool) -> Result<Vec<u8>> {
        // magic, then the end position (patched below)
        self.block(vec![b'J', b'L', 0x1A, 0, 0, 0, 0, 0]);

        let mut root = Vec::new();
        self.view(&mut root, view, true, diff)?;
        self.align();
        let rootpos = self.block(root);
        self.align();

        let mut tailpos = self.position;
        if tailpos + 16 > i32::MAX as u64 {
            self.pad_to_16();
            tailpos = self.position;
        }
        let endpos = tailpos + 16;
        if endpos >= MAX_FILE {
            return Err(Error::TooLarge(endpos));
        }
        let overflow = (endpos >> 31) as u32;

        let mut tail = Vec::with_capacity(16);
        tail.extend_from_slice(&(0x8000_0000u32 + overflow).to_be_bytes());
        tail.extend_from_slice(&(tailpos as u32).to_be_bytes());
        let kind: u32 = if diff { 0x90 } else { 0x80 };
        tail.extend_from_slice(&(kind << 24).wrapping_add((tailpos - rootpos) as u32).to_be_bytes());
        tail.extend_from_slice(&(rootpos as u32).to_be_bytes());
        if overflow != 0 {
            tail[12] |= 0x80;
        }
        self.block(tail);

        let head = &mut self.blocks[0];
        if overflow != 0 {
            head[3] = 0x80 | (endpos >> 36) as u8;
            head[4..8].copy_from_slice(&((endpos >> 4) as u32).to_be_bytes());
        } else {
            head[4..8].copy_from_slice(&(endpos as u32).to_be_bytes());
        }

        let mut bytes = Vec::with_capacity(endpos as usize);
        for block in &self.blocks {
            bytes.extend_from_slice(block);
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(bytes = endpos, root = rootpos, diff, "view emitted");
        Ok(bytes)
    }
}

/// Serialize `view` with an explicit configuration. In diff mode only the
/// changes of a mutable view relative to its parent are written.
pub fn save_with(view: &View, diff: bool, config: &EngineConfig) -> Result<Vec<u8>> {
    if diff && !view.is_mutable() {
        return Err(vq_core::Error::NotMutable.into());
    }
    Emitter::new(config).complete(view, diff)
}

/// Full serialization of `view`.
pub fn save(view: &View) -> Result<Vec<u8>> {
    save_with(view, false, &context::config())
}

/// Changes of a mutable view relative to its parent.
pub fn save_diff(view: &View) -> Result<Vec<u8>> {
    save_with(view, true, &context::config())
}

/// Write the full serialization of `view` to `out`; returns the byte count.
pub fn write_to<W: Write>(view: &View, mut out: W) -> Result<u64> {
    let bytes = save(view)?;
    out.write_all(&bytes)?;
    out.flush()?;
    Ok(bytes.len() as u64)
}

pub fn save_file(view: &View, path: impl AsRef<Path>) -> Result<u64> {
    let file = File::create(path.as_ref())?;
    write_to(view, BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(v: &[i32]) -> View {
        View::with_desc("a:I", vec![Column::from_ints(v.to_vec())]).unwrap()
    }

    #[test]
    fn small_view_layout() {
        let bytes = save(&ints(&[1, 2, 3])).unwrap();
        assert_eq!(&bytes[..4], &[b'J', b'L', 0x1A, 0]);
        let end = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(end as usize, bytes.len());
        // one packed data block right after the header
        assert_eq!(bytes[8], 0b0011_1001);

        let tail = &bytes[bytes.len() - 16..];
        assert_eq!(tail[0], 0x80);
        assert_eq!(tail[8], 0x80);
        let tailpos = u32::from_be_bytes(tail[4..8].try_into().unwrap()) as usize;
        assert_eq!(tailpos, bytes.len() - 16);
        let root = u32::from_be_bytes(tail[12..16].try_into().unwrap()) as usize;
        // root block: 0, desc "a:I", 3 rows, pair (1 byte at offset 8)
        assert_eq!(&bytes[root..tailpos], &[0x80, 0x83, b'a', b':', b'I', 0x83, 0x81, 0x88]);
    }

    #[test]
    fn diff_needs_mutable_view() {
        assert!(matches!(
            save_diff(&ints(&[1])),
            Err(Error::Core(vq_core::Error::NotMutable))
        ));
    }

    #[test]
    fn empty_strings_take_no_space() {
        let v = View::with_desc("s:S", vec![Column::from_strs(["", ""])]).unwrap();
        let bytes = save(&v).unwrap();
        let root = u32::from_be_bytes(bytes[bytes.len() - 4..].try_into().unwrap()) as usize;
        // 0, desc "s:S", 2 rows, empty blob pair, no memos
        assert_eq!(&bytes[root..root + 8], &[0x80, 0x83, b's', b':', b'S', 0x82, 0x80, 0x80]);
    }
}

//! Virtual views: lazily computed row mappings over other views.
//!
//! Each constructor wraps one shared sequence in `View::indirect`; nothing
//! is copied, rows are resolved on access.

use once_cell::unsync::OnceCell;

use crate::column::Column;
use crate::error::{Error, Result};
use crate::item::{Item, ItemType};
use crate::seq::{SeqKind, Sequence};
use crate::view::{compat, make_meta, View, MC_SUBV};

/// Rows of `view` picked by `map`.
pub fn remap(view: &View, map: &Column) -> View {
    remap_range(view, map, 0, map.len())
}

/// Rows of `view` picked by `map[start..start + count]`. A negative map
/// entry refers back that many entries to the row to use.
pub fn remap_range(view: &View, map: &Column, start: usize, count: usize) -> View {
    if view.width() == 0 {
        return View::no_columns(count);
    }
    let seq = Sequence::new(
        count,
        SeqKind::Remap {
            parent: view.clone(),
            map: map.clone(),
            start,
        },
    );
    View::indirect(&view.meta(), seq)
}

/// `count * rate` rows (saturating): result row `r` is parent row
/// `(offset + (r / rate) * step) mod rows`.
pub fn step(view: &View, count: usize, offset: i64, rate: usize, step: i64) -> View {
    if view.is_empty() {
        return view.clone();
    }
    let rate = rate.max(1);
    let seq = Sequence::new(
        count.saturating_mul(rate),
        SeqKind::Step {
            parent: view.clone(),
            offset,
            rate,
            step,
        },
    );
    View::indirect(&view.meta(), seq)
}

/// Rows of `a` followed by the rows of `b`.
pub fn concat(a: &View, b: &View) -> Result<View> {
    if !compat(a, b) {
        return Err(Error::Incompatible(format!(
            "{} vs {}",
            a.describe(),
            b.describe()
        )));
    }
    Ok(concat_unchecked(a, b))
}

pub(crate) fn concat_unchecked(a: &View, b: &View) -> View {
    if b.is_empty() {
        return a.clone();
    }
    if a.is_empty() {
        return b.clone();
    }
    let seq = Sequence::new(
        a.size() + b.size(),
        SeqKind::Concat {
            first: a.clone(),
            second: b.clone(),
        },
    );
    View::indirect(&a.meta(), seq)
}

/// One view column `name`: group `g` holds the rows
/// `groups[starts[g-1]..starts[g]]` of `view`.
pub fn grouped(view: &View, starts: &Column, groups: &Column, name: &str) -> View {
    let meta = make_meta(&[(name, ItemType::View, view.meta())]);
    let count = starts.len();
    let seq = Sequence::new(
        count,
        SeqKind::Grouped {
            parent: view.clone(),
            starts: starts.clone(),
            groups: groups.clone(),
            cache: (0..count).map(|_| OnceCell::new()).collect(),
        },
    );
    View::indirect(&meta, seq)
}

/// Flatten view column `col`: each row is repeated once per row of its
/// sub-view, with the sub-view's columns in place of `col`.
pub fn ungroup(view: &View, col: usize) -> Result<View> {
    if view.col_type(col) != ItemType::View {
        return Err(Error::Type {
            expected: ItemType::View,
            got: view.col_type(col),
        });
    }
    let mut map = Vec::new();
    for r in 0..view.size() {
        let n = view.get(r, col).as_view().map_or(0, View::size);
        if n > 0 {
            map.push(r as i32);
            map.extend((1..n).map(|i| -(i as i32)));
        }
    }

    let meta = view.meta();
    let submeta = view.submeta(col);
    let width = view.width();
    let head = concat_unchecked(&meta.first(col), &submeta);
    let newmeta = concat_unchecked(&head, &meta.last(width - col - 1));

    let seq = Sequence::new(
        map.len(),
        SeqKind::Ungrouped {
            parent: view.clone(),
            map: Column::from_ints(map),
            subcol: col,
            swidth: submeta.size(),
        },
    );
    Ok(View::indirect(&newmeta, seq))
}

/// Concatenate the blocks of a one-column view of views. Row `k` of the
/// last block serves as the separator after block `k`.
pub fn blocked(view: &View) -> Result<View> {
    if view.width() != 1 || view.col_type(0) != ItemType::View {
        return Err(Error::Incompatible(format!(
            "blocked view needs a single view column, got {}",
            view.describe()
        )));
    }
    let mut tally = 0;
    let limits = (0..view.size())
        .map(|r| {
            tally += view.get(r, 0).as_view().map_or(0, View::size);
            tally
        })
        .collect::<Vec<_>>();

    let submeta = match view.meta().get(0, MC_SUBV) {
        Item::View(m) => m,
        _ => crate::context::empty_meta(),
    };
    let seq = Sequence::new(
        tally,
        SeqKind::Blocked {
            parent: view.clone(),
            limits,
        },
    );
    Ok(View::indirect(&submeta, seq))
}

pub fn reverse(view: &View) -> View {
    step(view, view.size(), -1, 1, -1)
}

/// The whole view, `n` times over.
pub fn repeat(view: &View, n: usize) -> View {
    step(view, n.saturating_mul(view.size()), 0, 1, 1)
}

/// Each row `n` times in a row.
pub fn spread(view: &View, n: usize) -> View {
    step(view, view.size(), 0, n, 1)
}

pub fn slice(view: &View, start: i64, count: usize, stride: i64) -> View {
    step(view, count, start, 1, stride)
}

/// Cartesian product: every row of `a` paired with every row of `b`.
pub fn product(a: &View, b: &View) -> View {
    spread(a, b.size()).pair(&repeat(b, a.size()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(v: &[i32]) -> View {
        View::with_desc("a:I", vec![Column::from_ints(v.to_vec())]).unwrap()
    }

    fn values(v: &View, col: usize) -> Vec<Item> {
        (0..v.size()).map(|r| v.get(r, col)).collect()
    }

    #[test]
    fn remap_with_back_references() {
        let v = ints(&[10, 20, 30]);
        let m = remap(&v, &Column::from_ints(vec![2, -1, 0]));
        assert_eq!(values(&m, 0), vec![Item::Int(30), Item::Int(30), Item::Int(10)]);
        let sub = remap_range(&v, &Column::from_ints(vec![0, 1, 2]), 1, 2);
        assert_eq!(values(&sub, 0), vec![Item::Int(20), Item::Int(30)]);
    }

    #[test]
    fn step_family() {
        let v = ints(&[1, 2, 3]);
        assert_eq!(values(&reverse(&v), 0), vec![3.into(), 2.into(), 1.into()]);
        assert_eq!(repeat(&v, 2).size(), 6);
        assert_eq!(repeat(&v, 2).get(4, 0), Item::Int(2));
        assert_eq!(values(&spread(&v, 2), 0), vec![1.into(), 1.into(), 2.into(), 2.into(), 3.into(), 3.into()]);
        assert_eq!(values(&slice(&v, 0, 2, 2), 0), vec![1.into(), 3.into()]);
        let e = ints(&[]);
        assert!(View::ptr_eq(&step(&e, 5, 0, 1, 1), &e));
    }

    #[test]
    fn huge_steps_saturate() {
        let v = ints(&[1, 2, 3]);
        let s = step(&v, usize::MAX / 2 + 1, 0, 4, 1);
        assert_eq!(s.size(), usize::MAX);
        assert_eq!(s.get(0, 0), Item::Int(1));
        assert_eq!(repeat(&v, usize::MAX).size(), usize::MAX);
    }

    #[test]
    fn concat_maps_rows() {
        let a = ints(&[1, 2]);
        let b = ints(&[3]);
        let c = concat(&a, &b).unwrap();
        assert_eq!(values(&c, 0), vec![1.into(), 2.into(), 3.into()]);
        assert!(View::ptr_eq(&concat(&a, &ints(&[])).unwrap(), &a));
        let s = View::with_desc("s", vec![Column::from_strs(["x"])]).unwrap();
        assert!(concat(&a, &s).is_err());
    }

    #[test]
    fn group_then_ungroup() {
        let v = ints(&[5, 6, 7, 8]);
        let g = grouped(&v, &Column::from_ints(vec![1, 1, 4]), &Column::from_ints(vec![2, 0, 1, 3]), "g");
        assert_eq!(g.describe(), "g[a:I]");
        assert_eq!(g.size(), 3);
        let first = g.get(0, 0).into_view().unwrap();
        assert_eq!(values(&first, 0), vec![Item::Int(7)]);
        assert_eq!(g.get(1, 0).into_view().unwrap().size(), 0);

        let flat = ungroup(&g, 0).unwrap();
        assert_eq!(flat.describe(), "a:I");
        assert_eq!(values(&flat, 0), vec![7.into(), 5.into(), 6.into(), 8.into()]);
    }

    #[test]
    fn ungroup_keeps_outer_columns() {
        let inner = ints(&[1, 2]);
        let outer = View::with_desc(
            "k:S,sub[a:I],n:I",
            vec![
                Column::from_strs(["p", "q"]),
                Column::from_views(vec![inner.clone(), ints(&[])]),
                Column::from_ints(vec![7, 8]),
            ],
        )
        .unwrap();
        let flat = ungroup(&outer, 1).unwrap();
        assert_eq!(flat.describe(), "k:S,a:I,n:I");
        assert_eq!(flat.size(), 2);
        assert_eq!(flat.row(1), vec![Item::from("p"), Item::Int(2), Item::Int(7)]);
        assert!(ungroup(&outer, 0).is_err());
    }

    #[test]
    fn blocked_uses_last_block_as_separators() {
        let blocks = View::with_desc(
            "b[a:I]",
            vec![Column::from_views(vec![ints(&[1, 2]), ints(&[3]), ints(&[100, 101])])],
        )
        .unwrap();
        let flat = blocked(&blocks).unwrap();
        assert_eq!(flat.size(), 5);
        assert_eq!(values(&flat, 0), vec![1.into(), 2.into(), 100.into(), 3.into(), 101.into()]);
        assert!(blocked(&ints(&[1])).is_err());
    }

    #[test]
    fn product_pairs_everything() {
        let a = ints(&[1, 2]);
        let b = View::with_desc("s", vec![Column::from_strs(["x", "y", "z"])]).unwrap();
        let p = product(&a, &b);
        assert_eq!(p.size(), 6);
        assert_eq!(p.row(4), vec![Item::Int(2), Item::from("y")]);
    }
}

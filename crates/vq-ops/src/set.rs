//! Set operations on rows: unique, intersect, except and union.
//!
//! The `_map` variants return row numbers into their first argument (for
//! `union_map`, into the second); the plain variants remap those rows.

use vq_core::view::compat;
use vq_core::virt::{concat, remap};
use vq_core::{Column, View};

use crate::error::{Error, Result};
use crate::group::matching_rows;
use crate::hash::fill_hash_info;

fn check_compat(a: &View, b: &View) -> Result<()> {
    if compat(a, b) {
        Ok(())
    } else {
        Err(Error::Incompatible {
            left: a.describe(),
            right: b.describe(),
        })
    }
}

/// First occurrence of each distinct row.
pub fn uniq_map(view: &View) -> Column {
    Column::from_ints(fill_hash_info(view).map)
}

pub fn unique(view: &View) -> View {
    remap(view, &uniq_map(view))
}

/// Ascending rows of `keys` which also occur in `view`.
pub fn intersect_map(keys: &View, view: &View) -> Result<Column> {
    check_compat(keys, view)?;
    Ok(Column::from_ints(matching_rows(keys, view).0))
}

pub fn intersect(a: &View, b: &View) -> Result<View> {
    Ok(remap(a, &intersect_map(a, b)?))
}

/// Ascending rows of `a` which do not occur in `b`.
pub fn except_map(a: &View, b: &View) -> Result<Column> {
    Ok(Column::omit(&intersect_map(a, b)?, a.size()))
}

pub fn except(a: &View, b: &View) -> Result<View> {
    Ok(remap(a, &except_map(a, b)?))
}

/// Rows of `b` to append to `a` to form their union.
pub fn union_map(a: &View, b: &View) -> Result<Column> {
    except_map(b, a)
}

/// All rows of `a`, then the rows of `b` not in `a`.
pub fn union(a: &View, b: &View) -> Result<View> {
    Ok(concat(a, &except(b, a)?)?)
}

//! Grouping and joins.

use vq_core::virt::{grouped, remap, ungroup};
use vq_core::{Column, View};

use crate::error::{Error, Result};
use crate::hash::{fill_group_info, fill_join_info, HashInfo};

/// Group `view` on the columns listed in `cols`. The result holds each
/// distinct key once, in order of first occurrence, followed by one view
/// column `name` with the remaining columns of that key's rows.
pub fn group_col(view: &View, cols: &Column, name: &str) -> Result<View> {
    let keys = view.col_map(cols)?;
    let rest = view.col_omit(cols)?;
    let info = fill_group_info(&keys);
    let groups = grouped(
        &rest,
        &Column::from_ints(info.starts),
        &Column::from_ints(info.groups),
        name,
    );
    Ok(remap(&keys, &Column::from_ints(info.map)).pair(&groups))
}

/// `group_col` with the key columns given by name.
pub fn group_by(view: &View, keys: &[&str], name: &str) -> Result<View> {
    let cols = keys
        .iter()
        .map(|k| {
            view.col_by_name(k)
                .map(|c| c as i32)
                .ok_or_else(|| vq_core::Error::NoSuchColumn(k.to_string()))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    group_col(view, &Column::from_ints(cols), name)
}

/// Rows of `keys` also found in `view`, as ascending row numbers of `keys`
/// paired with the matching row numbers of `view`. Inputs are not checked
/// for compatibility.
pub(crate) fn matching_rows(keys: &View, view: &View) -> (Vec<i32>, Vec<i32>) {
    let info = HashInfo::build(view);
    let mut rows = Vec::new();
    let mut found = Vec::new();
    for r in 0..keys.size() {
        if let Some(g) = info.find(keys, r) {
            rows.push(r as i32);
            found.push(info.map[g]);
        }
    }
    (rows, found)
}

/// Outer join: each row of `left` gets a view column `name` with the rows
/// of `right` whose common columns (same name and type) are equal to its
/// own. Left rows without a match get an empty group.
pub fn join(left: &View, right: &View, name: &str) -> Result<View> {
    let (lmap, rmap) = matching_rows(&left.meta(), &right.meta());
    let rmap = Column::from_ints(rmap);

    let lkey = left.col_map(&Column::from_ints(lmap))?;
    let rkey = right.col_map(&rmap)?;
    let rest = right.col_omit(&rmap)?;

    let info = fill_join_info(&lkey, &rkey);
    let groups = grouped(
        &rest,
        &Column::from_ints(info.starts),
        &Column::from_ints(info.groups),
        name,
    );
    Ok(left.pair(&remap(&groups, &Column::from_ints(info.map))))
}

/// Inner join: one row per matching pair, with the right side's
/// non-common columns appended.
pub fn ijoin(left: &View, right: &View) -> Result<View> {
    let joined = join(left, right, "?")?;
    let last = joined.width().checked_sub(1).ok_or_else(|| Error::Incompatible {
        left: left.describe(),
        right: right.describe(),
    })?;
    Ok(ungroup(&joined, last)?)
}

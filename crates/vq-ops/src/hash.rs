//! Hash engine shared by grouping, joins and the set operations.
//!
//! A `HashInfo` indexes the distinct rows of one view: `map[g]` is the first
//! row of group `g` (groups numbered in order of discovery), `vec` is the
//! open-addressed probe table holding `g + 1` per occupied slot, and
//! `hashes` holds the per-row hash values of the indexed view.

use vq_core::fingerprint::{find_slot, hash_values, row_hash, table_size, Slot};
use vq_core::view::row_equal;
use vq_core::{Column, View};

#[derive(Debug, Clone)]
pub struct HashInfo {
    view: View,
    pub map: Vec<i32>,
    pub vec: Vec<i32>,
    pub hashes: Vec<i32>,
}

impl HashInfo {
    /// Empty index over `view`, sized for all of its rows.
    pub fn new(view: &View) -> Self {
        let rows = view.size();
        Self {
            view: view.clone(),
            map: Vec::with_capacity(rows),
            vec: vec![0; table_size(rows)],
            hashes: hash_values(view),
        }
    }

    /// Index every row of `view`; duplicates keep their first occurrence.
    pub fn build(view: &View) -> Self {
        let mut info = Self::new(view);
        for r in 0..view.size() {
            info.insert(r);
        }
        info
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Number of distinct rows seen so far.
    pub fn groups(&self) -> usize {
        self.map.len()
    }

    /// Group of row `row` of `key`, a view compatible with the indexed one.
    pub fn find(&self, key: &View, row: usize) -> Option<usize> {
        match self.probe(key, row, row_hash(key, row)) {
            Slot::Found(g) => Some(g),
            _ => None,
        }
    }

    fn probe(&self, key: &View, row: usize, hash: i32) -> Slot {
        let (map, hashes, view) = (&self.map, &self.hashes, &self.view);
        find_slot(&self.vec, hash, |g| {
            let data = map[g] as usize;
            hashes[data] == hash && row_equal(key, row, view, data)
        })
    }

    /// Group of row `row` of the indexed view, adding a new group when the
    /// row has not been seen. Returns the group and whether it is new.
    pub fn insert(&mut self, row: usize) -> (usize, bool) {
        let hash = self.hashes[row];
        match self.probe(&self.view, row, hash) {
            Slot::Found(g) => (g, false),
            Slot::Empty(slot) => {
                let g = self.map.len();
                self.vec[slot] = g as i32 + 1;
                self.map.push(row as i32);
                (g, true)
            }
            // only reachable with more rows than the table was sized for
            Slot::Full => {
                let g = self.map.len();
                self.map.push(row as i32);
                (g, true)
            }
        }
    }
}

/// Grouping of one view (or the matches of a join), as three int vectors.
///
/// `starts[g]` is the end of group `g` within `groups`; group `g` lists the
/// rows `groups[starts[g - 1]..starts[g]]` in ascending order.
#[derive(Debug, Clone, Default)]
pub struct GroupInfo {
    pub map: Vec<i32>,
    pub starts: Vec<i32>,
    pub groups: Vec<i32>,
}

/// Turn per-group linked lists into packed groups. `heads[g]` is the last
/// row of group `g` plus one (0 for none), `links[r]` the previous row of
/// the same group, or -1.
fn chase_links(heads: &[i32], links: &[i32], count: usize) -> (Vec<i32>, Vec<i32>) {
    let mut starts = vec![0; heads.len()];
    let mut groups = vec![0; count];
    let mut count = count;
    for g in (0..heads.len()).rev() {
        starts[g] = count as i32;
        let mut head = heads[g] - 1;
        while head >= 0 {
            count -= 1;
            groups[count] = head;
            head = links[head as usize];
        }
    }
    debug_assert_eq!(count, 0);
    (starts, groups)
}

/// Distinct rows of `view`, in order of first occurrence.
pub fn fill_hash_info(view: &View) -> HashInfo {
    HashInfo::build(view)
}

/// Group the rows of `view` by equality. `map` holds the first row of each
/// group.
pub fn fill_group_info(view: &View) -> GroupInfo {
    let rows = view.size();
    let mut info = HashInfo::new(view);
    let mut heads = Vec::new();
    let mut links = vec![-1; rows];
    for r in 0..rows {
        let (g, fresh) = info.insert(r);
        if fresh {
            heads.push(0);
        }
        links[r] = heads[g] - 1;
        heads[g] = r as i32 + 1;
    }
    let (starts, groups) = chase_links(&heads, &links, rows);
    GroupInfo {
        map: info.map,
        starts,
        groups,
    }
}

/// Group `left`, then collect the rows of `right` matching each group.
///
/// `map[r]` is the group of left row `r`; `starts`/`groups` describe, per
/// left group, the matching rows of `right`.
pub fn fill_join_info(left: &View, right: &View) -> GroupInfo {
    let mut info = HashInfo::new(left);
    let jmap = (0..left.size())
        .map(|r| info.insert(r).0 as i32)
        .collect::<Vec<_>>();

    let mut heads = vec![0; info.groups()];
    let mut links = vec![-1; right.size()];
    let mut used = 0;
    for r in 0..right.size() {
        if let Some(g) = info.find(right, r) {
            links[r] = heads[g] - 1;
            heads[g] = r as i32 + 1;
            used += 1;
        }
    }
    let (starts, groups) = chase_links(&heads, &links, used);
    GroupInfo {
        map: jmap,
        starts,
        groups,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Unique,
    Group,
    Join,
}

/// The three vectors behind a hash operation, for inspection: for
/// `Unique` the distinct-row map, probe table and row hashes; for `Group`
/// and `Join` the map, group ends and packed groups.
pub fn get_hash_info(left: &View, right: &View, kind: HashKind) -> [Column; 3] {
    let (a, b, c) = match kind {
        HashKind::Unique => {
            let info = fill_hash_info(left);
            (info.map, info.vec, info.hashes)
        }
        HashKind::Group => {
            let g = fill_group_info(left);
            (g.map, g.starts, g.groups)
        }
        HashKind::Join => {
            let g = fill_join_info(left, right);
            (g.map, g.starts, g.groups)
        }
    };
    [Column::from_ints(a), Column::from_ints(b), Column::from_ints(c)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(v: &[i32]) -> View {
        View::with_desc("a:I", vec![Column::from_ints(v.to_vec())]).unwrap()
    }

    #[test]
    fn distinct_rows_in_first_seen_order() {
        let info = fill_hash_info(&ints(&[4, 2, 4, 4, 9, 2]));
        assert_eq!(info.map, vec![0, 1, 4]);
        assert_eq!(info.vec.len(), 8);
        assert_eq!(info.hashes, vec![4, 2, 4, 4, 9, 2]);
        assert_eq!(info.find(&ints(&[9]), 0), Some(2));
        assert_eq!(info.find(&ints(&[5]), 0), None);
    }

    #[test]
    fn groups_are_packed_and_ascending() {
        let g = fill_group_info(&ints(&[7, 8, 7, 9, 8, 7]));
        assert_eq!(g.map, vec![0, 1, 3]);
        assert_eq!(g.starts, vec![3, 5, 6]);
        assert_eq!(g.groups, vec![0, 2, 5, 1, 4, 3]);
    }

    #[test]
    fn empty_view_has_no_groups() {
        let g = fill_group_info(&ints(&[]));
        assert!(g.map.is_empty() && g.starts.is_empty() && g.groups.is_empty());
    }

    #[test]
    fn join_collects_matching_right_rows() {
        let left = ints(&[1, 2, 1, 3]);
        let right = ints(&[2, 1, 5, 1]);
        let j = fill_join_info(&left, &right);
        assert_eq!(j.map, vec![0, 1, 0, 2]);
        assert_eq!(j.starts, vec![2, 3, 3]);
        assert_eq!(j.groups, vec![1, 3, 0]);
    }

    #[test]
    fn hash_info_vectors() {
        let v = ints(&[3, 3, 1]);
        let [map, starts, groups] = get_hash_info(&v, &v, HashKind::Group);
        assert_eq!(map.to_ints(), vec![0, 2]);
        assert_eq!(starts.to_ints(), vec![2, 3]);
        assert_eq!(groups.to_ints(), vec![0, 1, 2]);
        let [uniq, table, hashes] = get_hash_info(&v, &v, HashKind::Unique);
        assert_eq!(uniq.to_ints(), vec![0, 2]);
        assert_eq!(table.len(), 4);
        assert_eq!(hashes.to_ints(), vec![3, 3, 1]);
    }
}

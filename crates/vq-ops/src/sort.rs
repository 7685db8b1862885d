//! Stable merge sort over row indices.

use std::cmp::Ordering;

use vq_core::view::row_compare;
use vq_core::virt::remap;
use vq_core::{Column, View};

/// Row order with the row number as tie breaker, which makes the sort
/// stable.
fn row_is_less(view: &View, a: usize, b: usize) -> bool {
    if a == b {
        return false;
    }
    match row_compare(view, a, view, b) {
        Ordering::Equal => a < b,
        f => f == Ordering::Less,
    }
}

fn test_and_swap(view: &View, ar: &mut [usize], a: usize, b: usize) -> bool {
    if row_is_less(view, ar[b], ar[a]) {
        ar.swap(a, b);
        true
    } else {
        false
    }
}

/// Sort `ar` in place. `scratch` must hold the same entries as `ar` on
/// entry; its contents are lost.
fn merge_sort(view: &View, ar: &mut [usize], scratch: &mut [usize]) {
    match ar.len() {
        0 | 1 => {}
        2 => {
            test_and_swap(view, ar, 0, 1);
        }
        3 => {
            test_and_swap(view, ar, 0, 1);
            if test_and_swap(view, ar, 1, 2) {
                test_and_swap(view, ar, 0, 1);
            }
        }
        4 => {
            test_and_swap(view, ar, 0, 1);
            test_and_swap(view, ar, 2, 3);
            test_and_swap(view, ar, 0, 2);
            test_and_swap(view, ar, 1, 3);
            test_and_swap(view, ar, 1, 2);
        }
        n => {
            let half = n / 2;
            {
                let (f1, f2) = scratch.split_at_mut(half);
                let (a1, a2) = ar.split_at_mut(half);
                merge_sort(view, f1, a1);
                merge_sort(view, f2, a2);
            }
            let (f1, f2) = scratch.split_at(half);
            let (mut i, mut j) = (0, 0);
            for slot in ar.iter_mut() {
                let take_left = j >= f2.len() || (i < f1.len() && row_is_less(view, f1[i], f2[j]));
                if take_left {
                    *slot = f1[i];
                    i += 1;
                } else {
                    *slot = f2[j];
                    j += 1;
                }
            }
        }
    }
}

/// Permutation putting the rows of `view` in ascending order. Equal rows
/// keep their relative order.
pub fn sort_map(view: &View) -> Column {
    let rows = view.size();
    if rows <= 1 || view.width() == 0 {
        return Column::iota(rows);
    }
    let mut map: Vec<usize> = (0..rows).collect();
    let mut scratch = map.clone();
    merge_sort(view, &mut map, &mut scratch);
    Column::from_ints(map.into_iter().map(|r| r as i32).collect())
}

pub fn sort(view: &View) -> View {
    remap(view, &sort_map(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vq_core::Item;

    fn ints(v: &[i32]) -> View {
        View::with_desc("a:I", vec![Column::from_ints(v.to_vec())]).unwrap()
    }

    #[test]
    fn sorts_ints() {
        let v = ints(&[5, -3, 0, 100, -3]);
        assert_eq!(sort_map(&v).to_ints(), vec![1, 4, 2, 0, 3]);
        let s = sort(&v);
        let got: Vec<_> = (0..s.size()).map(|r| s.get(r, 0)).collect();
        assert_eq!(got, vec![Item::Int(-3), Item::Int(-3), Item::Int(0), Item::Int(5), Item::Int(100)]);
    }

    #[test]
    fn trivial_inputs_give_identity() {
        assert_eq!(sort_map(&ints(&[])).len(), 0);
        assert_eq!(sort_map(&ints(&[9])).to_ints(), vec![0]);
        assert_eq!(sort_map(&View::no_columns(3)).to_ints(), vec![0, 1, 2]);
    }

    #[test]
    fn sorts_on_later_columns_for_ties() {
        let v = View::with_desc(
            "k:S,n:I",
            vec![
                Column::from_strs(["b", "a", "b", "a"]),
                Column::from_ints(vec![2, 9, 1, 3]),
            ],
        )
        .unwrap();
        assert_eq!(sort_map(&v).to_ints(), vec![3, 1, 2, 0]);
    }

    proptest! {
        #[test]
        fn sort_map_is_a_stable_ordering(values in proptest::collection::vec(-20i32..20, 0..80)) {
            let v = ints(&values);
            let map = sort_map(&v).to_ints();
            let mut expect: Vec<i32> = (0..values.len() as i32).collect();
            expect.sort_by_key(|&r| values[r as usize]);
            prop_assert_eq!(&map, &expect);

            // sorting a sorted view changes nothing
            let sorted = sort(&v);
            let again = sort_map(&sorted).to_ints();
            prop_assert_eq!(again, (0..values.len() as i32).collect::<Vec<_>>());
        }
    }
}

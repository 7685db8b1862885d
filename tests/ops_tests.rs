//! Hashing, grouping, joins, set operations and sorting.

use proptest::prelude::*;
use vq::prelude::*;
use vq::vq_ops::{get_hash_info, max, min, sum, HashKind};

fn ints(values: &[i32]) -> View {
    View::with_desc("a:I", vec![Column::from_ints(values.to_vec())]).expect("int view")
}

fn int_values(view: &View, col: usize) -> Vec<i32> {
    (0..view.size()).filter_map(|r| view.get(r, col).as_int()).collect()
}

fn sample() -> View {
    View::with_desc(
        "a:I,b:S",
        vec![
            Column::from_ints(vec![1, 2, 3, 4, 5]),
            Column::from_strs(["x", "y", "x", "z", "y"]),
        ],
    )
    .expect("sample view")
}

#[test]
fn test_group_on_b() {
    let grouped = group_by(&sample(), &["b"], "g").expect("group");
    assert_eq!(grouped.describe(), "b:S,g[a:I]");
    let expected = [("x", vec![1, 3]), ("y", vec![2, 5]), ("z", vec![4])];
    assert_eq!(grouped.size(), expected.len());
    for (r, (key, rows)) in expected.iter().enumerate() {
        assert_eq!(grouped.get(r, 0), Item::from(*key));
        let sub = grouped.get(r, 1).into_view().expect("group view");
        assert_eq!(&int_values(&sub, 0), rows);
    }
}

#[test]
fn test_group_and_unique_on_three_rows() {
    let v = View::with_desc(
        "a:I,b:S",
        vec![Column::from_ints(vec![1, 2, 3]), Column::from_strs(["x", "y", "x"])],
    )
    .expect("three rows");
    let grouped = group_by(&v, &["b"], "g").expect("group");
    assert_eq!(grouped.describe(), "b:S,g[a:I]");
    assert_eq!(grouped.size(), 2);
    let first = grouped.get(0, 1).into_view().expect("group view");
    assert_eq!(int_values(&first, 0), vec![1, 3]);

    let b = v.col_map(&Column::from_ints(vec![1])).expect("column b");
    assert_eq!(uniq_map(&b).to_ints(), vec![0, 1]);
}

#[test]
fn test_sort_scenario() {
    let v = ints(&[5, -3, 0, 100, -3]);
    assert_eq!(sort_map(&v).to_ints(), vec![1, 4, 2, 0, 3]);
    assert_eq!(int_values(&sort(&v), 0), vec![-3, -3, 0, 5, 100]);
}

#[test]
fn test_sort_orders_by_all_columns() {
    let v = View::with_desc(
        "k:S,n:I",
        vec![
            Column::from_strs(["b", "a", "b", "a"]),
            Column::from_ints(vec![2, 9, 1, 3]),
        ],
    )
    .expect("view");
    let sorted = sort(&v);
    assert_eq!(sorted.row(0), vec![Item::from("a"), Item::Int(3)]);
    assert_eq!(sorted.row(1), vec![Item::from("a"), Item::Int(9)]);
    assert_eq!(sorted.row(3), vec![Item::from("b"), Item::Int(2)]);
}

#[test]
fn test_hash_info_kinds() {
    let v = ints(&[4, 4, 7, 4]);
    let [map, _, _] = get_hash_info(&v, &v, HashKind::Unique);
    assert_eq!(map.to_ints(), vec![0, 2]);

    let [map, starts, groups] = get_hash_info(&v, &v, HashKind::Group);
    assert_eq!(map.to_ints(), vec![0, 2]);
    assert_eq!(starts.len(), 2);
    assert_eq!(groups.len(), 4);
}

#[test]
fn test_joins() {
    let right = View::with_desc(
        "b:S,n:I",
        vec![
            Column::from_strs(["y", "q", "x", "y"]),
            Column::from_ints(vec![10, 20, 30, 40]),
        ],
    )
    .expect("right view");
    let outer = join(&sample(), &right, "m").expect("join");
    let counts: Vec<usize> = (0..outer.size())
        .map(|r| outer.get(r, 2).into_view().map_or(0, |v| v.size()))
        .collect();
    assert_eq!(counts, vec![1, 2, 1, 0, 2]);

    let inner = ijoin(&sample(), &right).expect("ijoin");
    assert_eq!(inner.size(), counts.iter().sum::<usize>());
    assert_eq!(inner.describe(), "a:I,b:S,n:I");
}

#[test]
fn test_set_operations() {
    let a = ints(&[1, 2, 3, 4]);
    let b = ints(&[4, 2, 6]);
    assert_eq!(int_values(&intersect(&a, &b).expect("intersect"), 0), vec![2, 4]);
    assert_eq!(int_values(&except(&a, &b).expect("except"), 0), vec![1, 3]);
    assert_eq!(int_values(&union(&a, &b).expect("union"), 0), vec![1, 2, 3, 4, 6]);
    assert_eq!(int_values(&unique(&ints(&[2, 2, 1, 2])), 0), vec![2, 1]);
}

#[test]
fn test_aggregates() {
    let v = View::with_desc(
        "n:I,x:D",
        vec![Column::from_ints(vec![3, -8, 5]), Column::from_doubles(vec![0.5, 0.25, 1.0])],
    )
    .expect("view");
    assert_eq!(max(&v, 0).expect("max"), Item::Int(5));
    assert_eq!(min(&v, 0).expect("min"), Item::Int(-8));
    assert_eq!(sum(&v, 0).expect("sum"), Item::Wide(0));
    assert_eq!(sum(&v, 1).expect("sum"), Item::Double(1.75));
    assert!(max(&ints(&[]), 0).is_err());
}

fn multiset(mut rows: Vec<Vec<Item>>) -> Vec<Vec<Item>> {
    rows.sort_by(|a, b| {
        a.iter()
            .zip(b)
            .map(|(x, y)| vq::vq_core::view::item_compare(x, y))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}

proptest! {
    #[test]
    fn prop_sort_map_orders_rows(values in proptest::collection::vec(-20i32..20, 0..60)) {
        let v = ints(&values);
        let map = sort_map(&v).to_ints();
        let mut seen = map.clone();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..values.len() as i32).collect::<Vec<_>>());
        for w in map.windows(2) {
            let (x, y) = (values[w[0] as usize], values[w[1] as usize]);
            prop_assert!(x < y || (x == y && w[0] < w[1]));
        }
        let sorted = sort(&v);
        prop_assert_eq!(sort_map(&sorted).to_ints(), (0..values.len() as i32).collect::<Vec<_>>());
    }

    #[test]
    fn prop_unique_is_idempotent(values in proptest::collection::vec(0i32..8, 0..50)) {
        let once = unique(&ints(&values));
        let twice = unique(&once);
        prop_assert_eq!(uniq_map(&once).to_ints(), (0..once.size() as i32).collect::<Vec<_>>());
        prop_assert_eq!(int_values(&once, 0), int_values(&twice, 0));
    }

    #[test]
    fn prop_group_then_ungroup_keeps_rows(
        keys in proptest::collection::vec(0i32..5, 1..40),
    ) {
        let n = keys.len() as i32;
        let v = View::with_desc(
            "k:I,v:I",
            vec![Column::from_ints(keys.clone()), Column::from_ints((0..n).collect())],
        ).unwrap();
        let grouped = group_by(&v, &["k"], "g").unwrap();
        let flat = ungroup(&grouped, 1).unwrap();
        prop_assert_eq!(flat.describe(), "k:I,v:I");
        let before = multiset((0..v.size()).map(|r| v.row(r)).collect());
        let after = multiset((0..flat.size()).map(|r| flat.row(r)).collect());
        prop_assert_eq!(before, after);
    }
}

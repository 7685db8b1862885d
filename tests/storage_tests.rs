//! Saving, loading and diff round trips.

use proptest::prelude::*;
use vq::prelude::*;
use vq::vq_io::{digest_bytes, open_diff, save_with, write_to, Error};

fn ints(values: &[i32]) -> View {
    View::with_desc("a:I", vec![Column::from_ints(values.to_vec())]).expect("int view")
}

fn round_trip(view: &View) -> View {
    load_bytes(save(view).expect("save")).expect("load")
}

fn every_type() -> View {
    let inner = |desc: &str, values: Vec<i32>| {
        View::with_desc(desc, vec![Column::from_ints(values)]).expect("inner view")
    };
    View::with_desc(
        "i:I,l:L,f:F,d:D,s:S,b:B,g[x:I],any:V",
        vec![
            Column::from_ints(vec![0, -70000, 3]),
            Column::from_wides(vec![i64::MIN, 0, 1 << 40]),
            Column::from_floats(vec![1.5, -0.0, 3.25]),
            Column::from_doubles(vec![f64::MAX, 2.5, -1e-9]),
            Column::from_strs(["", "héllo", "tab\there"]),
            Column::from_bytes([&b"\x00\x01"[..], b"", b"\xff"]),
            Column::from_views(vec![
                inner("x:I", vec![1, 2]),
                inner("x:I", vec![]),
                inner("x:I", vec![7]),
            ]),
            Column::from_views(vec![
                inner("p:I", vec![5]),
                View::with_desc("q:S", vec![Column::from_strs(["z"])]).expect("q"),
                View::no_columns(2),
            ]),
        ],
    )
    .expect("every type")
}

#[test]
fn test_save_load_scenario() {
    let loaded = round_trip(&ints(&[1, 2, 3]));
    assert_eq!(loaded.describe(), "a:I");
    assert_eq!(loaded.size(), 3);
    assert_eq!(loaded.get(1, 0), Item::Int(2));
}

#[test]
fn test_every_column_type_round_trips() {
    let v = every_type();
    let loaded = round_trip(&v);
    assert_eq!(loaded.describe(), v.describe());
    assert_eq!(loaded, v);
    assert_eq!(loaded.get(1, 4), Item::from("héllo"));
    assert_eq!(loaded.get(0, 5), Item::Bytes(vec![0, 1]));

    let any = loaded.get(1, 7).into_view().expect("nested view");
    assert_eq!(any.describe(), "q:S");
    assert_eq!(any.get(0, 0), Item::from("z"));
    assert_eq!(loaded.get(2, 7).into_view().expect("no columns").size(), 2);
}

#[test]
fn test_empty_views_round_trip() {
    let empty = ints(&[]);
    let loaded = round_trip(&empty);
    assert_eq!(loaded.describe(), "a:I");
    assert_eq!(loaded.size(), 0);

    let none = round_trip(&View::no_columns(0));
    assert_eq!(none.width(), 0);
    assert_eq!(none.size(), 0);
}

#[test]
fn test_aligned_blocks_still_load() {
    let config = EngineConfig {
        align_threshold: 0,
        align_min_block: 16,
        ..EngineConfig::default()
    };
    let v = View::with_desc(
        "w:L,n:I",
        vec![
            Column::from_wides((0..100).map(|i| i * 1_000_000_007).collect()),
            Column::from_ints((0..100).map(|i| i * 1000).collect()),
        ],
    )
    .expect("view");
    let bytes = save_with(&v, false, &config).expect("save");
    assert_eq!(bytes.len() % 16, 0);
    assert_eq!(load_bytes(bytes).expect("load"), v);
}

#[test]
fn test_loaded_views_can_be_changed_and_diffed() {
    let base = round_trip(&every_type());
    let changed = base
        .clone()
        .set(0, 4, &Item::from("now set"))
        .and_then(|v| v.set(2, 1, &Item::Wide(-5)))
        .and_then(|v| v.delete(1, 1))
        .expect("mutations");
    let diff = save_diff(&changed).expect("diff");
    let applied = apply_diff(&base, diff).expect("apply");
    assert_eq!(applied, changed);
    assert_eq!(applied.size(), 2);
    assert_eq!(applied.get(0, 4), Item::from("now set"));
    assert_eq!(applied.get(1, 1), Item::Wide(-5));
}

#[test]
fn test_long_deletions_are_run_coded() {
    let base = ints(&(0..1000).collect::<Vec<_>>());
    let changed = base.clone().delete(100, 800).expect("delete");
    let diff = save_diff(&changed).expect("diff");
    // a plain bitmap of the deleted rows alone would take 125 bytes
    assert!(diff.len() < 100, "diff is {} bytes", diff.len());
    let applied = apply_diff(&base, diff).expect("apply");
    assert_eq!(applied.size(), 200);
    assert_eq!(applied.get(100, 0), Item::Int(900));
}

#[test]
fn test_diff_rejects_wrong_inputs() {
    let base = ints(&[1, 2]);
    assert!(matches!(
        save_diff(&base),
        Err(Error::Core(vq::vq_core::Error::NotMutable))
    ));
    let full = save(&base).expect("save");
    assert!(apply_diff(&base, full).is_err());
    assert!(matches!(load_bytes(b"too short".to_vec()), Err(Error::Format(_))));
}

#[test]
fn test_files_and_writers() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("people.vq");
    let v = every_type();
    let written = save_file(&v, &path).expect("save file");

    let mut buffer = Vec::new();
    assert_eq!(write_to(&v, &mut buffer).expect("write"), written);
    assert_eq!(std::fs::read(&path).expect("read back"), buffer);

    let opened = open(&path).expect("open");
    assert_eq!(opened, v);
    assert_eq!(digest_view(&opened).expect("digest"), digest_bytes(&buffer));

    let changed = opened.clone().append(&opened).expect("append");
    let diff_path = dir.path().join("people.diff");
    std::fs::write(&diff_path, save_diff(&changed).expect("diff")).expect("write diff");
    let applied = open_diff(&opened, &diff_path).expect("open diff");
    assert_eq!(applied.size(), 6);
    assert_eq!(applied, changed);
}

proptest! {
    #[test]
    fn prop_full_save_round_trips(
        rows in proptest::collection::vec((any::<i32>(), "[a-z]{0,6}", any::<i64>()), 0..200),
    ) {
        let v = View::with_desc(
            "n:I,s:S,w:L",
            vec![
                Column::from_ints(rows.iter().map(|r| r.0).collect()),
                Column::from_strs(rows.iter().map(|r| r.1.as_str())),
                Column::from_wides(rows.iter().map(|r| r.2).collect()),
            ],
        ).unwrap();
        let loaded = load_bytes(save(&v).unwrap()).unwrap();
        prop_assert_eq!(loaded.size(), rows.len());
        prop_assert!(loaded == v);
    }

    #[test]
    fn prop_diff_replays_deletes_and_inserts(
        values in proptest::collection::vec(-1000i32..1000, 1..300),
        cut in 0usize..300,
        len in 0usize..200,
        extra in proptest::collection::vec(-5i32..5, 0..20),
    ) {
        let base = ints(&values);
        let cut = cut.min(values.len());
        let len = len.min(values.len() - cut);
        let changed = base.clone().delete(cut, len).unwrap().insert(cut.min(values.len() - len), &ints(&extra)).unwrap();
        if changed.is_mutable() {
            let applied = apply_diff(&base, save_diff(&changed).unwrap()).unwrap();
            prop_assert!(applied == changed);
        }
    }
}

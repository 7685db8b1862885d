use criterion::{criterion_group, criterion_main, Criterion};
use vq::prelude::*;

fn make_view(rows: usize) -> View {
    let mut keys = Vec::with_capacity(rows);
    let mut orders = Vec::with_capacity(rows);
    let mut values = Vec::with_capacity(rows);
    for i in 0..rows {
        keys.push(format!("group-{}", i % 16));
        orders.push(((i * 7919) % rows) as i32);
        values.push((i % 10) as f64);
    }
    View::with_desc(
        "group:S,order:I,value:D",
        vec![
            Column::from_strs(keys),
            Column::from_ints(orders),
            Column::from_doubles(values),
        ],
    )
    .unwrap()
}

fn bench_group_by(c: &mut Criterion) {
    let view = make_view(10_000);
    c.bench_function("group_by", |b| {
        b.iter(|| {
            let grouped = group_by(&view, &["group"], "rows").unwrap();
            // force every group to materialize
            (0..grouped.size())
                .map(|r| grouped.get(r, 1).into_view().map_or(0, |v| v.size()))
                .sum::<usize>()
        })
    });
}

fn bench_sort(c: &mut Criterion) {
    let view = make_view(10_000);
    c.bench_function("sort_map", |b| b.iter(|| sort_map(&view)));
}

fn bench_save_load(c: &mut Criterion) {
    let view = make_view(10_000);
    let bytes = save(&view).unwrap();
    c.bench_function("save", |b| b.iter(|| save(&view).unwrap()));
    c.bench_function("load_and_scan", |b| {
        b.iter(|| {
            let loaded = load_bytes(bytes.clone()).unwrap();
            (0..loaded.size())
                .filter_map(|r| loaded.get(r, 1).as_int())
                .map(i64::from)
                .sum::<i64>()
        })
    });
}

criterion_group!(views, bench_group_by, bench_sort, bench_save_load);
criterion_main!(views);

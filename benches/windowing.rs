//! Benchmarks for the series windowing store hot path

use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flowdash::store::{SeriesPoint, WindowPolicy, WindowStore};

fn at(offset: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + offset, 0).unwrap()
}

fn bench_append_with_eviction(c: &mut Criterion) {
    c.bench_function("append_evicting_300", |b| {
        let policy = WindowPolicy {
            window: Duration::seconds(300),
            max_points: 300,
        };
        b.iter(|| {
            let mut store = WindowStore::new(policy);
            for i in 0..2_000i64 {
                store.append("series", SeriesPoint::new(at(i), i as f64));
            }
            black_box(store.snapshot("series").len())
        });
    });
}

fn bench_seed_large_backfill(c: &mut Criterion) {
    let points: Vec<SeriesPoint> = (0..10_000i64)
        .rev()
        .map(|i| SeriesPoint::new(at(i), i as f64))
        .collect();

    c.bench_function("seed_10k_backfill", |b| {
        let policy = WindowPolicy {
            window: Duration::seconds(3_600),
            max_points: 3_600,
        };
        b.iter(|| {
            let mut store = WindowStore::new(policy);
            store.seed("series", black_box(points.clone()), at(10_000));
            black_box(store.snapshot("series").len())
        });
    });
}

criterion_group!(benches, bench_append_with_eviction, bench_seed_large_backfill);
criterion_main!(benches);

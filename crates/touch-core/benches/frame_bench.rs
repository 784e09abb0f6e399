//! Criterion benchmarks for event frame building.
//!
//! A frame is built for every plan step while the slot table lock is held,
//! so this is the per-step cost on the dispatch path.
//!
//! Run with:
//! ```bash
//! cargo bench --package touch-core --bench frame_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use touch_core::{FrameBuilder, IdentitySpace, Point, SlotTable, SurfaceId, TouchId, TouchPhase};

/// Creates a table with `n` touches that have all begun.
fn table_with_touches(n: usize) -> (SlotTable, Vec<TouchId>) {
    let mut table = SlotTable::with_capacity(n.max(1));
    let ids = table
        .acquire_many(n, SurfaceId(1))
        .expect("table sized for n touches");
    for (i, &id) in ids.iter().enumerate() {
        table
            .transition(id, TouchPhase::Began, Point::new(i as f64 * 10.0, 0.0))
            .expect("fresh slot may begin");
    }
    (table, ids)
}

fn bench_build_frame_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_frame_scaling");

    for count in [1usize, 2, 5, 10] {
        let (table, ids) = table_with_touches(count);
        let builder = FrameBuilder::new();
        group.bench_with_input(BenchmarkId::new("touches", count), &ids[0], |b, &id| {
            b.iter(|| builder.build_frame(black_box(&table), black_box(id), &IdentitySpace))
        });
    }

    group.finish();
}

fn bench_acquire_release_cycle(c: &mut Criterion) {
    let mut table = SlotTable::new();

    c.bench_function("acquire_release_cycle", |b| {
        b.iter(|| {
            let id = table.acquire(None, SurfaceId(1)).expect("table has room");
            table.release(black_box(id))
        })
    });
}

criterion_group!(benches, bench_build_frame_scaling, bench_acquire_release_cycle);
criterion_main!(benches);

//! Criterion benchmarks for gesture plan compilation.
//!
//! Compilation runs once per gesture command before any frame is delivered,
//! so it adds directly to the latency of the first touch-down.
//!
//! Run with:
//! ```bash
//! cargo bench --package touch-core --bench gesture_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use touch_core::{compile, CompileOptions, GestureSpec, Point};

// ── Benchmarks: single-finger gestures ───────────────────────────────────────

fn bench_compile_tap(c: &mut Criterion) {
    let opts = CompileOptions::default();
    let spec = GestureSpec::Tap {
        at: Point::new(100.0, 200.0),
    };

    c.bench_function("compile_tap", |b| {
        b.iter(|| compile(black_box(&spec), black_box(&opts)))
    });
}

/// Drag compilation scales linearly with the step count.
fn bench_compile_drag_scaling(c: &mut Criterion) {
    let opts = CompileOptions::default();
    let mut group = c.benchmark_group("compile_drag_scaling");

    for steps in [4usize, 32, 256] {
        let spec = GestureSpec::Drag {
            from: Point::new(0.0, 0.0),
            to: Point::new(1000.0, 500.0),
            steps,
        };
        group.bench_with_input(BenchmarkId::new("steps", steps), &spec, |b, spec| {
            b.iter(|| compile(black_box(spec), black_box(&opts)))
        });
    }

    group.finish();
}

// ── Benchmarks: two-finger gestures ──────────────────────────────────────────

fn bench_compile_two_finger(c: &mut Criterion) {
    let opts = CompileOptions::default();
    let center = Point::new(400.0, 400.0);
    let mut group = c.benchmark_group("compile_two_finger");

    let pinch = GestureSpec::Pinch {
        center,
        distance: 120.0,
        steps: 20,
    };
    group.bench_function("pinch_20_steps", |b| {
        b.iter(|| compile(black_box(&pinch), black_box(&opts)))
    });

    // 360° at the default 2°/step is the largest plan a single command produces
    let rotate = GestureSpec::Rotate {
        center,
        angle_degrees: 360.0,
    };
    group.bench_function("rotate_full_turn", |b| {
        b.iter(|| compile(black_box(&rotate), black_box(&opts)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_compile_tap,
    bench_compile_drag_scaling,
    bench_compile_two_finger,
);
criterion_main!(benches);

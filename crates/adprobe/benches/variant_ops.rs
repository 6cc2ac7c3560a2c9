//! Variant Generation Benchmarks
//!
//! Benchmarks for draws, subset enumeration, and outcome recording.
//!
//! Run with: `cargo bench --bench variant_ops`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use adprobe::{
    build_variants, Aggregate, Dimension, DimensionSet, Domain, Draw, Outcome, OutcomeKind,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

const BASE: &str = "http://localhost:3000/api/v1/ad";

fn draw_with(n: usize) -> Draw {
    Draw::from_pairs((0..n).map(|i| (format!("d{i}"), i * 7))).unwrap()
}

fn bench_build_variants(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_variants");

    for n in [1usize, 2, 4, 6, 8, 12] {
        let draw = draw_with(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &draw, |bench, draw| {
            bench.iter(|| {
                let set = build_variants(black_box(BASE), black_box(draw), false);
                black_box(set);
            });
        });
    }

    group.finish();
}

fn bench_iteration_prep(c: &mut Criterion) {
    let mut group = c.benchmark_group("iteration_prep");
    let dims = DimensionSet::ad_filters();
    let mut rng = StdRng::seed_from_u64(1);

    group.bench_function("draw", |bench| {
        bench.iter(|| black_box(dims.draw(&mut rng)));
    });

    group.bench_function("draw_build_choose", |bench| {
        bench.iter(|| {
            let draw = dims.draw(&mut rng);
            let set = build_variants(BASE, &draw, true);
            black_box(set.choose(&mut rng).url().len());
        });
    });

    let wide = DimensionSet::new(
        (0..8)
            .map(|i| Dimension::new(format!("f{i}"), Domain::range(0, 1_000)).unwrap())
            .collect(),
    )
    .unwrap();
    group.bench_function("draw_build_choose_8_dims", |bench| {
        bench.iter(|| {
            let draw = wide.draw(&mut rng);
            let set = build_variants(BASE, &draw, false);
            black_box(set.choose(&mut rng).url().len());
        });
    });

    group.finish();
}

fn bench_aggregate_record(c: &mut Criterion) {
    let agg = Aggregate::new();
    let outcome = Outcome {
        shape: "age&country".to_string(),
        url: format!("{BASE}?age=42&country=TW"),
        status: Some(200),
        latency: Duration::from_millis(12),
        kind: OutcomeKind::Passed,
    };

    c.bench_function("aggregate_record", |bench| {
        bench.iter(|| agg.record(black_box(&outcome)));
    });
}

criterion_group!(
    benches,
    bench_build_variants,
    bench_iteration_prep,
    bench_aggregate_record
);
criterion_main!(benches);

//! Scheduler benchmarks.
//!
//! Measures how fast simulated time advances for typical topologies.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use queuesim::{Histogram, Pipeline, PipelineConfig, PercentilePoint, StageSpec, us_to_ns};

const TICKS: u64 = 10_000;

fn write_path(in_flight: usize) -> Pipeline {
    Pipeline::new(
        PipelineConfig::default().with_seed(42),
        vec![
            StageSpec::queue("InputQ", in_flight),
            StageSpec::fixed_pool("PDisk", 1, us_to_ns(5)),
            StageSpec::queue("SubmitQ", 0),
            StageSpec::fixed_pool("Smb", 1, us_to_ns(2)),
            StageSpec::percentile_pool(
                "NVMe",
                128,
                vec![
                    PercentilePoint::new(16.47, us_to_ns(12)),
                    PercentilePoint::new(87.26, us_to_ns(25)),
                    PercentilePoint::new(99.7, us_to_ns(50)),
                    PercentilePoint::new(100.0, us_to_ns(4_000)),
                ],
            ),
            StageSpec::ordering_barrier("Flush"),
        ],
    )
    .expect("valid topology")
}

// ============================================================================
// Pipeline Benchmarks
// ============================================================================

fn bench_write_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_write_path");
    group.throughput(Throughput::Elements(TICKS));

    for in_flight in [1, 32, 128] {
        group.bench_with_input(
            BenchmarkId::from_parameter(in_flight),
            &in_flight,
            |b, &in_flight| {
                b.iter_batched(
                    || write_path(in_flight),
                    |mut pipeline| {
                        pipeline.run_ticks(black_box(TICKS), us_to_ns(1));
                        black_box(pipeline.completed());
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

// ============================================================================
// Histogram Benchmarks
// ============================================================================

fn bench_histogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("histogram");

    group.bench_function("add", |b| {
        let mut histogram = Histogram::with_us_buckets();
        let mut value = 0u64;
        b.iter(|| {
            value = (value + 7) % 5_000;
            histogram.add(black_box(value));
        });
    });

    group.bench_function("percentile_p99", |b| {
        let mut histogram = Histogram::with_us_buckets();
        for value in 0..100_000 {
            histogram.add(value % 5_000);
        }
        b.iter(|| black_box(histogram.percentile(black_box(99))));
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(pipeline_benches, bench_write_path, bench_histogram);

criterion_main!(pipeline_benches);

//! Seeded runs must be reproducible.

use proptest::prelude::*;
use queuesim::{Pipeline, PipelineConfig, PercentilePoint, StageSpec, us_to_ns};

fn sampled_pipeline(seed: u64) -> Pipeline {
    let table = vec![
        PercentilePoint::new(3.813, us_to_ns(12)),
        PercentilePoint::new(51.59, us_to_ns(25)),
        PercentilePoint::new(98.851, us_to_ns(50)),
        PercentilePoint::new(99.956, us_to_ns(100)),
        PercentilePoint::new(99.983, us_to_ns(200)),
        PercentilePoint::new(100.0, us_to_ns(4_000)),
    ];

    Pipeline::new(
        PipelineConfig::default().with_seed(seed),
        vec![
            StageSpec::queue("InputQ", 16),
            StageSpec::fixed_pool("Cpu", 2, us_to_ns(3)),
            StageSpec::percentile_pool("Disk", 16, table.clone()),
            StageSpec::queue("Mid", 0),
            StageSpec::percentile_pool("Replica", 16, table),
            StageSpec::ordering_barrier("Flush"),
        ],
    )
    .expect("valid topology")
}

#[test]
fn same_seed_produces_identical_reports() {
    let mut a = sampled_pipeline(42);
    let mut b = sampled_pipeline(42);

    for _ in 0..10 {
        a.run_ticks(1_000, us_to_ns(1));
        b.run_ticks(1_000, us_to_ns(1));
        assert_eq!(a.report(), b.report());
    }
    assert_eq!(a.latency_histogram(), b.latency_histogram());
}

#[test]
fn different_seeds_diverge() {
    let mut a = sampled_pipeline(1);
    let mut b = sampled_pipeline(2);
    a.run_ticks(50_000, us_to_ns(1));
    b.run_ticks(50_000, us_to_ns(1));

    assert_ne!(a.latency_histogram().counts(), b.latency_histogram().counts());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Any seed replays to the same completion count and latency profile.
    #[test]
    fn prop_replay_is_exact(seed in any::<u64>()) {
        let mut a = sampled_pipeline(seed);
        let mut b = sampled_pipeline(seed);
        a.run_ticks(2_000, us_to_ns(1));
        b.run_ticks(2_000, us_to_ns(1));

        prop_assert_eq!(a.completed(), b.completed());
        prop_assert_eq!(a.latency_histogram(), b.latency_histogram());
        prop_assert_eq!(a.population(), 16);
    }
}

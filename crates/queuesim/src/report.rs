//! Read-only reports for renderers and drivers.

use std::fmt;

use serde::Serialize;

use crate::clock::ns_to_sec;
use crate::histogram::Histogram;
use crate::stage::{StageKind, StageSnapshot};

/// Percentiles reported for end-to-end latency.
pub const REPORT_PERCENTILES: [u32; 5] = [10, 50, 90, 99, 100];

/// End-to-end latency at the reported percentiles, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LatencySummary {
    pub p10_us: Option<u64>,
    pub p50_us: Option<u64>,
    pub p90_us: Option<u64>,
    pub p99_us: Option<u64>,
    pub p100_us: Option<u64>,
}

impl LatencySummary {
    pub fn from_histogram(histogram: &Histogram) -> Self {
        let [p10, p50, p90, p99, p100] =
            REPORT_PERCENTILES.map(|p| histogram.percentile(p).ok().flatten());
        Self {
            p10_us: p10,
            p50_us: p50,
            p90_us: p90,
            p99_us: p99,
            p100_us: p100,
        }
    }
}

/// Snapshot of a whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub elapsed_ns: u64,
    pub completed: u64,
    /// Completed events per simulated second.
    pub throughput: f64,
    /// Events currently in flight across all stages.
    pub population: usize,
    pub latency: LatencySummary,
    pub stages: Vec<StageSnapshot>,
}

/// Formats a count with a K/M/G suffix, truncating.
pub fn format_count(n: u64) -> String {
    match n {
        0..1_000 => n.to_string(),
        1_000..1_000_000 => format!("{}K", n / 1_000),
        1_000_000..1_000_000_000 => format!("{}M", n / 1_000_000),
        _ => format!("{}G", n / 1_000_000_000),
    }
}

fn us(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v} us"))
}

impl fmt::Display for StageSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.workers) {
            (StageKind::FixedPool | StageKind::PercentilePool, Some(workers)) => {
                write!(f, "{}: {}/{}", self.name, workers.busy, workers.slots)?;
                if let Some(load) = workers.load_average {
                    write!(f, ", load {:.0}%", load * 100.0)?;
                }
                Ok(())
            }
            _ => write!(
                f,
                "{}: {}, p90: {}",
                self.name,
                format_count(self.occupancy as u64),
                us(self.stage_time_p90_us)
            ),
        }
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "TimePassed: {:.2} s, Events: {}, AvgRPS: {:.0}",
            ns_to_sec(self.elapsed_ns),
            format_count(self.completed),
            self.throughput
        )?;
        writeln!(
            f,
            "p10: {}, p50: {}, p90: {}, p99: {}, p100: {}",
            us(self.latency.p10_us),
            us(self.latency.p50_us),
            us(self.latency.p90_us),
            us(self.latency.p99_us),
            us(self.latency.p100_us)
        )?;
        let stages: Vec<String> = self.stages.iter().map(ToString::to_string).collect();
        write!(f, "{}", stages.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::WorkerSnapshot;
    use test_case::test_case;

    #[test_case(0, "0")]
    #[test_case(999, "999")]
    #[test_case(1_000, "1K")]
    #[test_case(32_768, "32K")]
    #[test_case(1_500_000, "1M")]
    #[test_case(7_000_000_000, "7G")]
    fn counts_use_suffixes(n: u64, expected: &str) {
        assert_eq!(format_count(n), expected);
    }

    #[test]
    fn empty_histogram_summary_is_absent() {
        let summary = LatencySummary::from_histogram(&Histogram::with_us_buckets());
        assert_eq!(summary, LatencySummary::default());
    }

    #[test]
    fn summary_reads_percentiles() {
        let mut h = Histogram::new(vec![10, 20]).unwrap();
        for _ in 0..9 {
            h.add(1);
        }
        h.add(15);
        let summary = LatencySummary::from_histogram(&h);
        assert_eq!(summary.p10_us, Some(10));
        assert_eq!(summary.p90_us, Some(10));
        assert_eq!(summary.p99_us, Some(10));
        assert_eq!(summary.p100_us, Some(20));
    }

    #[test]
    fn report_renders_stages() {
        let report = PipelineReport {
            elapsed_ns: 1_500_000_000,
            completed: 12_345,
            throughput: 8_230.0,
            population: 2,
            latency: LatencySummary::default(),
            stages: vec![
                StageSnapshot {
                    name: "InputQ".to_string(),
                    kind: StageKind::Queue,
                    occupancy: 1,
                    released: 10,
                    stage_time_p90_us: Some(6),
                    workers: None,
                    watermark: None,
                },
                StageSnapshot {
                    name: "Disk".to_string(),
                    kind: StageKind::FixedPool,
                    occupancy: 1,
                    released: 10,
                    stage_time_p90_us: Some(5),
                    workers: Some(WorkerSnapshot {
                        slots: 4,
                        busy: 1,
                        ready: 0,
                        load_average: Some(0.25),
                    }),
                    watermark: None,
                },
            ],
        };

        let text = report.to_string();
        assert!(text.starts_with("TimePassed: 1.50 s, Events: 12K, AvgRPS: 8230"));
        assert!(text.contains("p10: -"));
        assert!(text.contains("InputQ: 1, p90: 6 us -> Disk: 1/4, load 25%"));
    }
}

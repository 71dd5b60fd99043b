//! Fixed-bucket percentile estimator.
//!
//! A [`Histogram`] holds a sorted list of bucket upper bounds and one counter
//! per bucket plus an overflow counter. A value lands in the first bucket
//! whose bound is strictly greater than it; values at or above the last
//! bound land in the overflow bucket.
//!
//! Percentiles are answered with bucket bounds, not interpolated values:
//!
//! ```text
//! threshold = floor(p * total / 100)
//! answer    = bound of the first bucket whose cumulative count >= threshold
//! ```
//!
//! The overflow bucket has no upper bound of its own; it reports the last
//! configured bound, which is the lower bound of everything it holds.

use crate::error::SimError;

/// Bucket bounds in microseconds used for all wait-time and latency
/// histograms unless a caller supplies its own.
const US_BUCKETS: &[u64] = &[
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, //
    16, 24, 32, 40, 48, 50, 54, 62, 70, //
    80, 90, 100, 110, 120, 130, 140, 150, 160, 170, 180, 190, 200, //
    250, 300, 350, 450, 500, 750, 1_000, 1_250, 1_500, 1_750, 2_000, //
    2_250, 2_500, 2_750, 3_000, 3_250, 3_500, 3_750, 4_000, 4_250, 4_500, 4_750, 5_000, //
    6_000, 7_000, 8_000, 9_000, 10_000, 11_000, 12_000, 13_000, 14_000, 15_000, 16_000, 17_000,
    18_000, 19_000, 20_000, //
    24_000, 32_000, 40_000, 48_000, 56_000, 64_000, //
    128_000, 256_000, 512_000, //
    1_000_000, 1_500_000, 2_000_000, 3_000_000, 4_000_000,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    bounds: Vec<u64>,
    /// `bounds.len() + 1` counters; the last one is the overflow bucket.
    counts: Vec<u64>,
}

impl Histogram {
    /// Creates a histogram with the given bucket upper bounds.
    ///
    /// Bounds must be non-empty and non-decreasing.
    pub fn new(bounds: Vec<u64>) -> Result<Self, SimError> {
        if bounds.is_empty() {
            return Err(SimError::EmptyBuckets);
        }

        for (index, pair) in bounds.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(SimError::UnsortedBuckets {
                    index: index + 1,
                    bound: pair[1],
                    previous: pair[0],
                });
            }
        }

        let counts = vec![0; bounds.len() + 1];
        Ok(Self { bounds, counts })
    }

    /// Histogram with the default microsecond bucket layout.
    pub fn with_us_buckets() -> Self {
        Self {
            bounds: US_BUCKETS.to_vec(),
            counts: vec![0; US_BUCKETS.len() + 1],
        }
    }

    /// Records one observation.
    pub fn add(&mut self, value: u64) {
        // First bucket whose bound exceeds the value; `bounds.len()` is overflow.
        let index = self.bounds.partition_point(|&bound| bound <= value);
        self.counts[index] += 1;
    }

    /// Total number of observations.
    pub fn count(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn bounds(&self) -> &[u64] {
        &self.bounds
    }

    /// Per-bucket counts, overflow last.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Returns the bucket bound at percentile `p`.
    ///
    /// `Ok(None)` when nothing has been recorded yet.
    pub fn percentile(&self, p: u32) -> Result<Option<u64>, SimError> {
        if p > 100 {
            return Err(SimError::PercentileOutOfRange(p));
        }

        let total = self.count();
        if total == 0 {
            return Ok(None);
        }

        let threshold = u64::from(p) * total / 100;
        let mut cumulative = 0;
        for (index, count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= threshold {
                return Ok(Some(self.bound_of(index)));
            }
        }

        // cumulative == total >= threshold on the last iteration.
        unreachable!("percentile scan exhausted {} buckets", self.counts.len())
    }

    fn bound_of(&self, index: usize) -> u64 {
        let last = self.bounds.len() - 1;
        self.bounds[index.min(last)]
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::with_us_buckets()
    }
}

//! Error types for simulation construction and queries.

use thiserror::Error;

/// Errors surfaced by the simulator.
///
/// All of these are configuration mistakes detected when a histogram, stage
/// or pipeline is built, or an invalid query argument. Broken propagation
/// contracts (popping from a stage that is not ready, pushing into a full
/// pool) are bugs and panic instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("histogram buckets must not be empty")]
    EmptyBuckets,

    #[error("histogram buckets must be sorted: bound {bound} at index {index} is below {previous}")]
    UnsortedBuckets { index: usize, bound: u64, previous: u64 },

    #[error("percentile must be between 0 and 100, got {0}")]
    PercentileOutOfRange(u32),

    #[error("percentile table must not be empty")]
    EmptyPercentileTable,

    #[error("percentile breakpoint {breakpoint} at index {index} must be in (0, 100]")]
    BreakpointOutOfRange { index: usize, breakpoint: f64 },

    #[error("percentile breakpoints must be sorted: {breakpoint} at index {index} is below {previous}")]
    UnsortedBreakpoints { index: usize, breakpoint: f64, previous: f64 },

    #[error("worker pool '{0}' needs at least one worker")]
    NoWorkers(String),

    #[error("stage names must not be empty")]
    EmptyStageName,

    #[error("pipeline needs at least two stages, got {0}")]
    TooFewStages(usize),

    #[error("load window must be positive")]
    ZeroLoadWindow,
}

//! # queuesim: Deterministic Closed-Loop Pipeline Simulation
//!
//! Models a multi-stage queueing pipeline (a storage write path, say) under
//! constant concurrency, to study latency percentiles and throughput of
//! "what-if" stage configurations without a live system.

#![allow(clippy::cast_precision_loss)] // Throughput and load are f64 ratios of counters
#![cfg_attr(test, allow(clippy::float_cmp))] // Test assertions use exact float comparisons
#![cfg_attr(test, allow(clippy::unreadable_literal))] // Test constants and seeds
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Pipeline                                │
//! │  ┌────────────┐   ┌────────────┐   ┌────────────────────────────┐ │
//! │  │ SimClock   │   │ EventIds   │   │ SimRng (forked per pool)   │ │
//! │  └────────────┘   └────────────┘   └────────────────────────────┘ │
//! │                                                                    │
//! │   head                                                     tail    │
//! │  ┌───────┐   ┌────────────┐   ┌───────┐   ┌──────────────────┐     │
//! │  │ Queue │──>│ WorkerPool │──>│ Queue │──>│ OrderingBarrier  │──┐  │
//! │  └───────┘   └────────────┘   └───────┘   └──────────────────┘  │  │
//! │      ^                                                           │  │
//! │      └────────── fresh event per completion ─────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use queuesim::{Pipeline, PipelineConfig, StageSpec, us_to_ns};
//!
//! let mut pipeline = Pipeline::new(
//!     PipelineConfig::default().with_seed(42),
//!     vec![
//!         StageSpec::queue("InputQ", 1),
//!         StageSpec::fixed_pool("Disk", 1, us_to_ns(5)),
//!     ],
//! )
//! .expect("valid topology");
//!
//! pipeline.run_ticks(1_000, us_to_ns(1));
//! assert_eq!(pipeline.population(), 1);
//! println!("{}", pipeline.report());
//! ```
//!
//! ## Key Concepts
//!
//! - **`SimClock`**: discrete simulated time, nanosecond precision
//! - **`Event`**: token with a dense, strictly increasing id
//! - **`Histogram`**: fixed-bucket percentile estimator
//! - **`Stage`**: queue, worker pool or ordering barrier
//! - **`Pipeline`**: tick-driven propagation and closed-loop feedback

mod clock;
mod error;
mod event;
mod histogram;
mod pipeline;
mod report;
mod rng;
pub mod stage;

pub use clock::{
    NS_PER_MS, NS_PER_SEC, NS_PER_US, SimClock, ms_to_ns, ns_to_sec, ns_to_us, sec_to_ns,
    us_to_ns,
};
pub use error::SimError;
pub use event::{Event, EventId, EventIds, Route};
pub use histogram::Histogram;
pub use pipeline::{Pipeline, PipelineConfig};
pub use report::{LatencySummary, PipelineReport, REPORT_PERCENTILES, format_count};
pub use rng::{Rng, SimRng};
pub use stage::{
    OrderingBarrier, PercentilePoint, PercentileTable, Queue, Stage, StageKind, StageSnapshot,
    StageSpec, WorkerPool, WorkerSnapshot,
};

//! Pipeline stages.
//!
//! Every stage implements the same small contract:
//!
//! - `tick(now)` advances internal timers. It never moves events between
//!   stages; only the pipeline does that.
//! - `can_push()` / `push(event, now)` accept an event.
//! - `can_pop()` / `pop(now)` release an event.
//!
//! `push` and `pop` may only be called after the matching readiness check
//! returned `true`. Calling them otherwise is a bug in the caller and panics.
//!
//! Three variants exist:
//!
//! | Stage              | Accepts          | Releases                           |
//! |--------------------|------------------|------------------------------------|
//! | [`Queue`]          | always           | FIFO head, if any                  |
//! | [`WorkerPool`]     | while a slot idle| first slot whose work is finished  |
//! | [`OrderingBarrier`]| always           | lowest id, only if `watermark + 1` |

mod ordering_barrier;
mod queue;
mod worker_pool;

pub use ordering_barrier::OrderingBarrier;
pub use queue::Queue;
pub use worker_pool::{
    DEFAULT_LOAD_WINDOW_NS, PercentilePoint, PercentileSampler, PercentileTable, ServiceTime,
    WorkerPool,
};

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventId};

/// Capability contract shared by all stages.
pub trait Stage: Send {
    /// Display name of the stage.
    fn name(&self) -> &str;

    /// Advances internal timers to `now_ns`.
    fn tick(&mut self, now_ns: u64);

    /// Whether `push` may be called.
    fn can_push(&self) -> bool;

    /// Accepts an event.
    ///
    /// # Panics
    ///
    /// Panics if `can_push()` is false.
    fn push(&mut self, event: Event, now_ns: u64);

    /// Whether `pop` may be called.
    fn can_pop(&self) -> bool;

    /// Releases an event.
    ///
    /// # Panics
    ///
    /// Panics if `can_pop()` is false.
    fn pop(&mut self, now_ns: u64) -> Event;

    /// Number of events currently held by the stage.
    fn occupancy(&self) -> usize;

    /// Read-only view for reporting.
    fn snapshot(&self) -> StageSnapshot;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    Queue,
    FixedPool,
    PercentilePool,
    OrderingBarrier,
}

/// Worker slot usage of a pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerSnapshot {
    pub slots: usize,
    /// Slots working or holding a finished event.
    pub busy: usize,
    /// Slots holding a finished event waiting to be popped.
    pub ready: usize,
    /// Busy fraction over the last closed load window.
    pub load_average: Option<f64>,
}

/// Point-in-time view of one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSnapshot {
    pub name: String,
    pub kind: StageKind,
    pub occupancy: usize,
    /// Events released so far.
    pub released: u64,
    /// 90th percentile of time spent in the stage, in microseconds.
    pub stage_time_p90_us: Option<u64>,
    pub workers: Option<WorkerSnapshot>,
    /// Highest id released by an ordering barrier.
    pub watermark: Option<EventId>,
}

/// Construction parameters for one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageSpec {
    /// FIFO queue seeded with `initial_events` fresh events.
    Queue { name: String, initial_events: usize },
    /// Pool of `workers` slots, each taking `service_time_ns` per event.
    FixedPool {
        name: String,
        workers: usize,
        service_time_ns: u64,
    },
    /// Pool of `workers` slots with service times drawn from `table`.
    PercentilePool {
        name: String,
        workers: usize,
        table: Vec<PercentilePoint>,
    },
    /// Gate releasing events strictly in creation order.
    OrderingBarrier { name: String },
}

impl StageSpec {
    pub fn queue(name: impl Into<String>, initial_events: usize) -> Self {
        Self::Queue {
            name: name.into(),
            initial_events,
        }
    }

    pub fn fixed_pool(name: impl Into<String>, workers: usize, service_time_ns: u64) -> Self {
        Self::FixedPool {
            name: name.into(),
            workers,
            service_time_ns,
        }
    }

    pub fn percentile_pool(
        name: impl Into<String>,
        workers: usize,
        table: Vec<PercentilePoint>,
    ) -> Self {
        Self::PercentilePool {
            name: name.into(),
            workers,
            table,
        }
    }

    pub fn ordering_barrier(name: impl Into<String>) -> Self {
        Self::OrderingBarrier { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Queue { name, .. }
            | Self::FixedPool { name, .. }
            | Self::PercentilePool { name, .. }
            | Self::OrderingBarrier { name } => name,
        }
    }

    pub fn kind(&self) -> StageKind {
        match self {
            Self::Queue { .. } => StageKind::Queue,
            Self::FixedPool { .. } => StageKind::FixedPool,
            Self::PercentilePool { .. } => StageKind::PercentilePool,
            Self::OrderingBarrier { .. } => StageKind::OrderingBarrier,
        }
    }

    /// Events this stage starts with.
    pub fn initial_events(&self) -> usize {
        match self {
            Self::Queue { initial_events, .. } => *initial_events,
            _ => 0,
        }
    }
}

//! Fixed-size pool of simulated workers.
//!
//! Each slot runs one event at a time on its own timer. All timers advance in
//! the same `tick` call; no real threads are involved.
//!
//! A slot moves through three states:
//!
//! ```text
//!   Idle --push--> Working --tick (elapsed >= service)--> Ready --pop--> Idle
//! ```
//!
//! Service time is either fixed or drawn per event from a [`PercentileTable`]
//! by inverse-CDF sampling.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{Stage, StageKind, StageSnapshot, WorkerSnapshot};
use crate::clock::{NS_PER_SEC, ns_to_us};
use crate::error::SimError;
use crate::event::Event;
use crate::histogram::Histogram;
use crate::rng::Rng;

/// Load reporting window used when none is configured (1 simulated second).
pub const DEFAULT_LOAD_WINDOW_NS: u64 = NS_PER_SEC;

// ============================================================================
// Service time models
// ============================================================================

/// One row of a latency table: `percentile` percent of draws take at most
/// `duration_ns`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentilePoint {
    pub percentile: f64,
    pub duration_ns: u64,
}

impl PercentilePoint {
    pub fn new(percentile: f64, duration_ns: u64) -> Self {
        Self {
            percentile,
            duration_ns,
        }
    }
}

/// Validated discrete inverse-CDF table.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentileTable {
    points: Vec<PercentilePoint>,
}

impl PercentileTable {
    /// Validates a table: non-empty, every breakpoint in `(0, 100]`,
    /// breakpoints non-decreasing.
    pub fn new(points: Vec<PercentilePoint>) -> Result<Self, SimError> {
        if points.is_empty() {
            return Err(SimError::EmptyPercentileTable);
        }

        let mut previous = 0.0;
        for (index, point) in points.iter().enumerate() {
            let breakpoint = point.percentile;
            if !(breakpoint > 0.0 && breakpoint <= 100.0) {
                return Err(SimError::BreakpointOutOfRange { index, breakpoint });
            }
            if breakpoint < previous {
                return Err(SimError::UnsortedBreakpoints {
                    index,
                    breakpoint,
                    previous,
                });
            }
            previous = breakpoint;
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[PercentilePoint] {
        &self.points
    }

    /// Maps a draw in `[0, 100)` to a duration: the first row whose
    /// breakpoint exceeds the draw, or the last row.
    pub fn lookup(&self, draw: f64) -> u64 {
        self.points
            .iter()
            .find(|point| draw < point.percentile)
            .or_else(|| self.points.last())
            .map_or(0, |point| point.duration_ns)
    }
}

/// Percentile table paired with the generator that drives it.
pub struct PercentileSampler {
    table: PercentileTable,
    rng: Box<dyn Rng>,
}

impl PercentileSampler {
    pub fn new(table: PercentileTable, rng: Box<dyn Rng>) -> Self {
        Self { table, rng }
    }

    pub fn table(&self) -> &PercentileTable {
        &self.table
    }

    /// Draws one service duration.
    pub fn sample(&mut self) -> u64 {
        let draw = self.rng.next_percent();
        self.table.lookup(draw)
    }
}

impl fmt::Debug for PercentileSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PercentileSampler")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum ServiceTime {
    Fixed(u64),
    Sampled(PercentileSampler),
}

impl ServiceTime {
    fn next_duration(&mut self) -> u64 {
        match self {
            Self::Fixed(duration_ns) => *duration_ns,
            Self::Sampled(sampler) => sampler.sample(),
        }
    }

    fn kind(&self) -> StageKind {
        match self {
            Self::Fixed(_) => StageKind::FixedPool,
            Self::Sampled(_) => StageKind::PercentilePool,
        }
    }
}

// ============================================================================
// Slots
// ============================================================================

#[derive(Debug)]
enum SlotState {
    Idle,
    Working {
        event: Event,
        started_ns: u64,
        service_ns: u64,
    },
    Ready {
        event: Event,
        finished_ns: u64,
    },
}

#[derive(Debug)]
struct Slot {
    state: SlotState,
    /// Start of the busy or idle interval not yet folded into the totals.
    mark_ns: u64,
    busy_ns: u64,
    idle_ns: u64,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: SlotState::Idle,
            mark_ns: 0,
            busy_ns: 0,
            idle_ns: 0,
        }
    }

    fn is_idle(&self) -> bool {
        matches!(self.state, SlotState::Idle)
    }

    fn is_ready(&self) -> bool {
        matches!(self.state, SlotState::Ready { .. })
    }

    fn start(&mut self, event: Event, now_ns: u64, service_ns: u64) {
        debug_assert!(self.is_idle(), "slot started while occupied");
        self.idle_ns += now_ns.saturating_sub(self.mark_ns);
        self.mark_ns = now_ns;
        self.state = SlotState::Working {
            event,
            started_ns: now_ns,
            service_ns,
        };
    }

    fn tick(&mut self, now_ns: u64) {
        if let SlotState::Working {
            started_ns,
            service_ns,
            ..
        } = self.state
        {
            if now_ns.saturating_sub(started_ns) >= service_ns {
                let SlotState::Working { event, .. } =
                    std::mem::replace(&mut self.state, SlotState::Idle)
                else {
                    unreachable!("slot state changed during tick");
                };
                self.state = SlotState::Ready {
                    event,
                    finished_ns: now_ns,
                };
            }
        }
    }

    fn take(&mut self, now_ns: u64) -> Event {
        match std::mem::replace(&mut self.state, SlotState::Idle) {
            SlotState::Ready { event, finished_ns } => {
                debug_assert!(finished_ns <= now_ns);
                self.busy_ns += now_ns.saturating_sub(self.mark_ns);
                self.mark_ns = now_ns;
                event
            }
            other => panic!("slot popped while not ready: {other:?}"),
        }
    }

    /// Folds the open interval into the totals and returns `(busy, idle)`,
    /// resetting both.
    fn close_window(&mut self, now_ns: u64) -> (u64, u64) {
        let open = now_ns.saturating_sub(self.mark_ns);
        if self.is_idle() {
            self.idle_ns += open;
        } else {
            self.busy_ns += open;
        }
        self.mark_ns = now_ns;
        let totals = (self.busy_ns, self.idle_ns);
        self.busy_ns = 0;
        self.idle_ns = 0;
        totals
    }
}

// ============================================================================
// Worker pool
// ============================================================================

#[derive(Debug)]
pub struct WorkerPool {
    name: String,
    service: ServiceTime,
    slots: Vec<Slot>,
    stage_time_us: Histogram,
    load_window_ns: u64,
    window_start_ns: u64,
    load_average: Option<f64>,
}

impl WorkerPool {
    /// Creates a pool where every event takes `service_time_ns`.
    pub fn fixed(
        name: impl Into<String>,
        workers: usize,
        service_time_ns: u64,
    ) -> Result<Self, SimError> {
        Self::new(name.into(), workers, ServiceTime::Fixed(service_time_ns))
    }

    /// Creates a pool sampling service times from `table` with `rng`.
    pub fn percentile(
        name: impl Into<String>,
        workers: usize,
        table: Vec<PercentilePoint>,
        rng: Box<dyn Rng>,
    ) -> Result<Self, SimError> {
        let table = PercentileTable::new(table)?;
        Self::new(
            name.into(),
            workers,
            ServiceTime::Sampled(PercentileSampler::new(table, rng)),
        )
    }

    fn new(name: String, workers: usize, service: ServiceTime) -> Result<Self, SimError> {
        if name.is_empty() {
            return Err(SimError::EmptyStageName);
        }
        if workers == 0 {
            return Err(SimError::NoWorkers(name));
        }

        Ok(Self {
            name,
            service,
            slots: (0..workers).map(|_| Slot::new()).collect(),
            stage_time_us: Histogram::with_us_buckets(),
            load_window_ns: DEFAULT_LOAD_WINDOW_NS,
            window_start_ns: 0,
            load_average: None,
        })
    }

    /// Sets the load reporting window.
    pub fn with_load_window_ns(mut self, window_ns: u64) -> Result<Self, SimError> {
        if window_ns == 0 {
            return Err(SimError::ZeroLoadWindow);
        }
        self.load_window_ns = window_ns;
        Ok(self)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slots working on or holding an event.
    pub fn busy_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_idle()).count()
    }

    /// Slots holding a finished event.
    pub fn ready_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_ready()).count()
    }

    /// Busy fraction over the last closed window; `None` before the first
    /// window closes.
    pub fn load_average(&self) -> Option<f64> {
        self.load_average
    }

    /// Time events spent in this pool, from push to pop.
    pub fn stage_time_histogram(&self) -> &Histogram {
        &self.stage_time_us
    }

    fn close_load_window(&mut self, now_ns: u64) {
        let (busy, idle) = self
            .slots
            .iter_mut()
            .map(|slot| slot.close_window(now_ns))
            .fold((0u64, 0u64), |(b, i), (sb, si)| (b + sb, i + si));

        let total = busy + idle;
        if total > 0 {
            self.load_average = Some(busy as f64 / total as f64);
        }
        self.window_start_ns = now_ns;

        trace!(
            pool = %self.name,
            busy_ns = busy,
            idle_ns = idle,
            load = ?self.load_average,
            "load window closed"
        );
    }
}

impl Stage for WorkerPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn tick(&mut self, now_ns: u64) {
        for slot in &mut self.slots {
            slot.tick(now_ns);
        }

        if now_ns.saturating_sub(self.window_start_ns) >= self.load_window_ns {
            self.close_load_window(now_ns);
        }
    }

    fn can_push(&self) -> bool {
        self.slots.iter().any(Slot::is_idle)
    }

    fn push(&mut self, mut event: Event, now_ns: u64) {
        let service_ns = self.service.next_duration();
        let name = &self.name;
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_idle())
            .unwrap_or_else(|| panic!("worker pool '{name}' is full"));

        event.enter_stage(now_ns);
        slot.start(event, now_ns, service_ns);
    }

    fn can_pop(&self) -> bool {
        self.slots.iter().any(Slot::is_ready)
    }

    fn pop(&mut self, now_ns: u64) -> Event {
        let name = &self.name;
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_ready())
            .unwrap_or_else(|| panic!("worker pool '{name}' has no finished event"));

        let event = slot.take(now_ns);
        self.stage_time_us.add(ns_to_us(event.stage_duration(now_ns)));
        event
    }

    fn occupancy(&self) -> usize {
        self.busy_count()
    }

    fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            name: self.name.clone(),
            kind: self.service.kind(),
            occupancy: self.busy_count(),
            released: self.stage_time_us.count(),
            stage_time_p90_us: self.stage_time_us.percentile(90).ok().flatten(),
            workers: Some(WorkerSnapshot {
                slots: self.slot_count(),
                busy: self.busy_count(),
                ready: self.ready_count(),
                load_average: self.load_average,
            }),
            watermark: None,
        }
    }
}

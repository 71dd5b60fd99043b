//! Closed-loop pipeline scheduler.
//!
//! A [`Pipeline`] owns an ordered list of stages (index 0 is the head, the
//! last one the tail), the simulated clock and the event id allocator. Each
//! call to [`Pipeline::tick`] runs one fixed step:
//!
//! 1. Advance the clock by `dt`.
//! 2. Tick every stage with the new `now`.
//! 3. Two propagation passes over stage pairs, tail-adjacent pair first.
//!    Each pair drains `stage[i-1] -> stage[i]` while the source can pop and
//!    the destination can push. The second pass moves events that reached an
//!    instant stage (queue, barrier) during the first pass one hop further.
//! 4. Closed-loop completion: events popped from the tail are recorded in the
//!    end-to-end histogram and replaced by brand-new events pushed into the
//!    head, so the population in flight never changes.
//! 5. Recompute throughput.
//!
//! Two passes do not guarantee that a chain of three or more instant stages
//! drains within one tick; remaining events move on in later ticks.

use tracing::{debug, trace};

use crate::clock::{SimClock, ns_to_sec, ns_to_us};
use crate::error::SimError;
use crate::event::EventIds;
use crate::histogram::Histogram;
use crate::report::{LatencySummary, PipelineReport};
use crate::rng::{Rng, SimRng};
use crate::stage::{
    DEFAULT_LOAD_WINDOW_NS, OrderingBarrier, Queue, Stage, StageSnapshot, StageSpec, WorkerPool,
};

const PROPAGATION_PASSES: usize = 2;

// ============================================================================
// Configuration
// ============================================================================

/// Run-wide settings shared by all stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Seed for every sampled service time in the run.
    pub seed: u64,
    /// Load reporting window for worker pools.
    pub load_window_ns: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            load_window_ns: DEFAULT_LOAD_WINDOW_NS,
        }
    }
}

impl PipelineConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_load_window_ns(mut self, load_window_ns: u64) -> Self {
        self.load_window_ns = load_window_ns;
        self
    }
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct Pipeline {
    clock: SimClock,
    ids: EventIds,
    stages: Vec<Box<dyn Stage>>,
    seed_population: usize,
    completed: u64,
    latency_us: Histogram,
    throughput: f64,
}

impl Pipeline {
    /// Builds a pipeline from stage specifications.
    ///
    /// Seed events are created in stage order at time zero, so a queue
    /// earlier in the list gets the lower ids.
    pub fn new(config: PipelineConfig, specs: Vec<StageSpec>) -> Result<Self, SimError> {
        if specs.len() < 2 {
            return Err(SimError::TooFewStages(specs.len()));
        }

        let clock = SimClock::new();
        let mut ids = EventIds::new();
        let mut rng = SimRng::new(config.seed);
        let mut stages: Vec<Box<dyn Stage>> = Vec::with_capacity(specs.len());
        let mut seed_population = 0;

        for spec in specs {
            if spec.name().is_empty() {
                return Err(SimError::EmptyStageName);
            }

            let stage: Box<dyn Stage> = match spec {
                StageSpec::Queue {
                    name,
                    initial_events,
                } => {
                    let mut queue = Queue::new(name);
                    for _ in 0..initial_events {
                        queue.push(ids.create(clock.now()), clock.now());
                    }
                    seed_population += initial_events;
                    Box::new(queue)
                }
                StageSpec::FixedPool {
                    name,
                    workers,
                    service_time_ns,
                } => Box::new(
                    WorkerPool::fixed(name, workers, service_time_ns)?
                        .with_load_window_ns(config.load_window_ns)?,
                ),
                StageSpec::PercentilePool {
                    name,
                    workers,
                    table,
                } => Box::new(
                    WorkerPool::percentile(name, workers, table, rng.fork())?
                        .with_load_window_ns(config.load_window_ns)?,
                ),
                StageSpec::OrderingBarrier { name } => Box::new(OrderingBarrier::new(name)),
            };
            stages.push(stage);
        }

        debug!(
            stages = stages.len(),
            seed_population,
            seed = config.seed,
            "pipeline built"
        );

        Ok(Self {
            clock,
            ids,
            stages,
            seed_population,
            completed: 0,
            latency_us: Histogram::with_us_buckets(),
            throughput: 0.0,
        })
    }

    /// Advances the simulation by `dt_ns`.
    pub fn tick(&mut self, dt_ns: u64) {
        self.clock.advance_by(dt_ns);
        let now = self.clock.now();

        for stage in &mut self.stages {
            stage.tick(now);
        }

        for _ in 0..PROPAGATION_PASSES {
            self.propagate(now);
        }

        self.complete(now);

        let elapsed_sec = ns_to_sec(now);
        if elapsed_sec > 0.0 {
            self.throughput = self.completed as f64 / elapsed_sec;
        }
    }

    /// Runs `ticks` steps of `dt_ns` each.
    pub fn run_ticks(&mut self, ticks: u64, dt_ns: u64) {
        for _ in 0..ticks {
            self.tick(dt_ns);
        }
    }

    /// One pass over all adjacent pairs, tail-adjacent pair first.
    fn propagate(&mut self, now: u64) {
        for i in (1..self.stages.len()).rev() {
            let (upstream, downstream) = self.stages.split_at_mut(i);
            let from = &mut upstream[i - 1];
            let to = &mut downstream[0];
            while from.can_pop() && to.can_push() {
                let event = from.pop(now);
                to.push(event, now);
            }
        }
    }

    /// Recycles finished events from the tail into fresh events at the head.
    fn complete(&mut self, now: u64) {
        let tail_index = self.stages.len() - 1;
        let (front, back) = self.stages.split_at_mut(tail_index);
        let head = &mut front[0];
        let tail = &mut back[0];

        while tail.can_pop() && head.can_push() {
            let finished = tail.pop(now);
            let latency_ns = finished.duration(now);
            self.latency_us.add(ns_to_us(latency_ns));
            self.completed += 1;

            trace!(event = %finished.id(), latency_ns, "event completed");

            head.push(self.ids.create(now), now);
        }
    }

    /// Current simulated time, which is also the elapsed time of the run.
    pub fn elapsed_ns(&self) -> u64 {
        self.clock.now()
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Completed events per simulated second.
    pub fn throughput(&self) -> f64 {
        self.throughput
    }

    /// End-to-end latency histogram in microseconds.
    pub fn latency_histogram(&self) -> &Histogram {
        &self.latency_us
    }

    pub fn latency(&self) -> LatencySummary {
        LatencySummary::from_histogram(&self.latency_us)
    }

    pub fn stages(&self) -> impl Iterator<Item = &dyn Stage> {
        self.stages.iter().map(AsRef::as_ref)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Events in flight across all stages.
    pub fn population(&self) -> usize {
        self.stages.iter().map(|stage| stage.occupancy()).sum()
    }

    /// Events the pipeline was seeded with.
    pub fn seed_population(&self) -> usize {
        self.seed_population
    }

    /// Total events created, seed population included.
    pub fn events_created(&self) -> u64 {
        self.ids.issued()
    }

    pub fn stage_snapshots(&self) -> Vec<StageSnapshot> {
        self.stages.iter().map(|stage| stage.snapshot()).collect()
    }

    pub fn report(&self) -> PipelineReport {
        PipelineReport {
            elapsed_ns: self.elapsed_ns(),
            completed: self.completed,
            throughput: self.throughput,
            population: self.population(),
            latency: self.latency(),
            stages: self.stage_snapshots(),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|stage| stage.name()).collect();
        f.debug_struct("Pipeline")
            .field("now_ns", &self.clock.now())
            .field("stages", &names)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::us_to_ns;
    use crate::stage::PercentilePoint;

    fn config() -> PipelineConfig {
        PipelineConfig::default().with_seed(7)
    }

    #[test]
    fn single_stage_rejected() {
        let err = Pipeline::new(config(), vec![StageSpec::queue("q", 1)]).unwrap_err();
        assert_eq!(err, SimError::TooFewStages(1));
    }

    #[test]
    fn empty_stage_name_rejected() {
        let err = Pipeline::new(
            config(),
            vec![StageSpec::queue("q", 1), StageSpec::ordering_barrier("")],
        )
        .unwrap_err();
        assert_eq!(err, SimError::EmptyStageName);
    }

    #[test]
    fn invalid_table_rejected() {
        let err = Pipeline::new(
            config(),
            vec![
                StageSpec::queue("q", 1),
                StageSpec::percentile_pool("disk", 1, Vec::new()),
            ],
        )
        .unwrap_err();
        assert_eq!(err, SimError::EmptyPercentileTable);
    }

    #[test]
    fn zero_load_window_rejected() {
        let err = Pipeline::new(
            config().with_load_window_ns(0),
            vec![StageSpec::queue("q", 1), StageSpec::fixed_pool("w", 1, 10)],
        )
        .unwrap_err();
        assert_eq!(err, SimError::ZeroLoadWindow);
    }

    #[test]
    fn seeds_population_into_queues() {
        let pipeline = Pipeline::new(
            config(),
            vec![
                StageSpec::queue("in", 3),
                StageSpec::fixed_pool("w", 1, 10),
                StageSpec::queue("mid", 2),
            ],
        )
        .unwrap();

        assert_eq!(pipeline.seed_population(), 5);
        assert_eq!(pipeline.population(), 5);
        assert_eq!(pipeline.events_created(), 5);
        assert_eq!(pipeline.stage_count(), 3);
    }

    #[test]
    fn queue_to_queue_moves_everything_in_one_tick() {
        let mut pipeline = Pipeline::new(
            config(),
            vec![
                StageSpec::queue("in", 4),
                StageSpec::fixed_pool("w", 4, us_to_ns(10)),
            ],
        )
        .unwrap();

        pipeline.tick(us_to_ns(1));
        let snapshots = pipeline.stage_snapshots();
        assert_eq!(snapshots[0].occupancy, 0);
        assert_eq!(snapshots[1].occupancy, 4);
    }

    #[test]
    fn second_pass_carries_events_through_an_instant_stage() {
        // The pair (mid, w2) is examined before (w1, mid), so an event leaving
        // w1 only reaches w2 thanks to the second pass.
        let mut pipeline = Pipeline::new(
            config(),
            vec![
                StageSpec::queue("in", 1),
                StageSpec::fixed_pool("w1", 1, us_to_ns(1)),
                StageSpec::queue("mid", 0),
                StageSpec::fixed_pool("w2", 1, us_to_ns(100)),
            ],
        )
        .unwrap();

        pipeline.tick(us_to_ns(1)); // in -> w1
        pipeline.tick(us_to_ns(1)); // w1 finishes, -> mid -> w2

        let snapshots = pipeline.stage_snapshots();
        assert_eq!(snapshots[2].occupancy, 0);
        assert_eq!(snapshots[3].occupancy, 1);
    }

    #[test]
    fn completion_recycles_into_head() {
        let mut pipeline = Pipeline::new(
            config(),
            vec![
                StageSpec::queue("in", 1),
                StageSpec::fixed_pool("w", 1, us_to_ns(2)),
            ],
        )
        .unwrap();

        pipeline.tick(us_to_ns(1)); // enters w at 1us
        pipeline.tick(us_to_ns(1));
        assert_eq!(pipeline.completed(), 0);
        pipeline.tick(us_to_ns(1)); // finishes at 3us

        assert_eq!(pipeline.completed(), 1);
        assert_eq!(pipeline.events_created(), 2);
        assert_eq!(pipeline.population(), 1);
        assert_eq!(pipeline.latency_histogram().count(), 1);
        // Created at 0, completed at 3us: bucket bounded by 4.
        assert_eq!(pipeline.latency().p100_us, Some(4));
        let expected = 1.0 / ns_to_sec(us_to_ns(3));
        assert!((pipeline.throughput() - expected).abs() < 1e-3);
    }

    #[test]
    fn throughput_is_zero_before_time_passes() {
        let mut pipeline = Pipeline::new(
            config(),
            vec![StageSpec::queue("in", 1), StageSpec::ordering_barrier("b")],
        )
        .unwrap();
        pipeline.tick(0);
        assert_eq!(pipeline.throughput(), 0.0);
    }

    #[test]
    fn barrier_tail_completes_in_creation_order() {
        let mut pipeline = Pipeline::new(
            config(),
            vec![
                StageSpec::queue("in", 8),
                StageSpec::percentile_pool(
                    "disk",
                    8,
                    vec![
                        PercentilePoint::new(30.0, us_to_ns(1)),
                        PercentilePoint::new(70.0, us_to_ns(5)),
                        PercentilePoint::new(100.0, us_to_ns(20)),
                    ],
                ),
                StageSpec::ordering_barrier("flush"),
            ],
        )
        .unwrap();

        let mut last_watermark = 0;
        for _ in 0..2_000 {
            pipeline.tick(us_to_ns(1));
            let watermark = pipeline.stage_snapshots()[2]
                .watermark
                .expect("barrier snapshot has a watermark")
                .as_u64();
            assert!(watermark >= last_watermark);
            last_watermark = watermark;
            assert_eq!(pipeline.population(), 8);
        }

        assert_eq!(last_watermark, pipeline.completed());
        assert!(pipeline.completed() > 0);
    }

    #[test]
    fn debug_lists_stage_names() {
        let pipeline = Pipeline::new(
            config(),
            vec![StageSpec::queue("in", 1), StageSpec::ordering_barrier("b")],
        )
        .unwrap();
        let text = format!("{pipeline:?}");
        assert!(text.contains("\"in\""));
        assert!(text.contains("\"b\""));
    }
}

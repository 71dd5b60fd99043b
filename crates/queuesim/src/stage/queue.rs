//! Unbounded FIFO queue stage.

use std::collections::VecDeque;

use super::{Stage, StageKind, StageSnapshot};
use crate::clock::ns_to_us;
use crate::event::Event;
use crate::histogram::Histogram;

#[derive(Debug, Clone)]
pub struct Queue {
    name: String,
    events: VecDeque<Event>,
    wait_us: Histogram,
}

impl Queue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: VecDeque::new(),
            wait_us: Histogram::with_us_buckets(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Time events spent waiting in this queue.
    pub fn wait_histogram(&self) -> &Histogram {
        &self.wait_us
    }
}

impl Stage for Queue {
    fn name(&self) -> &str {
        &self.name
    }

    fn tick(&mut self, _now_ns: u64) {}

    fn can_push(&self) -> bool {
        true
    }

    fn push(&mut self, mut event: Event, now_ns: u64) {
        event.enter_stage(now_ns);
        self.events.push_back(event);
    }

    fn can_pop(&self) -> bool {
        !self.events.is_empty()
    }

    fn pop(&mut self, now_ns: u64) -> Event {
        let event = self
            .events
            .pop_front()
            .unwrap_or_else(|| panic!("queue '{}' popped while empty", self.name));
        self.wait_us.add(ns_to_us(event.stage_duration(now_ns)));
        event
    }

    fn occupancy(&self) -> usize {
        self.events.len()
    }

    fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            name: self.name.clone(),
            kind: StageKind::Queue,
            occupancy: self.events.len(),
            released: self.wait_us.count(),
            stage_time_p90_us: self.wait_us.percentile(90).ok().flatten(),
            workers: None,
            watermark: None,
        }
    }
}

//! Flush controller: releases events strictly in creation order.
//!
//! Events may arrive out of order from concurrent upstream stages. The
//! barrier keeps them in an id-ordered set and releases the lowest id only
//! when it is exactly `watermark + 1`, where the watermark is the highest id
//! released so far. Every id at or below the watermark has left the barrier.

use std::collections::BTreeMap;

use super::{Stage, StageKind, StageSnapshot};
use crate::clock::ns_to_us;
use crate::event::{Event, EventId};
use crate::histogram::Histogram;

#[derive(Debug, Clone)]
pub struct OrderingBarrier {
    name: String,
    waiting: BTreeMap<EventId, Event>,
    watermark: EventId,
    wait_us: Histogram,
}

impl OrderingBarrier {
    /// Creates a barrier expecting id 1 first.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_watermark(name, EventId::default())
    }

    /// Creates a barrier that considers every id up to `watermark` released.
    pub fn with_watermark(name: impl Into<String>, watermark: EventId) -> Self {
        Self {
            name: name.into(),
            waiting: BTreeMap::new(),
            watermark,
            wait_us: Histogram::with_us_buckets(),
        }
    }

    /// Highest id released so far.
    pub fn watermark(&self) -> EventId {
        self.watermark
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    pub fn wait_histogram(&self) -> &Histogram {
        &self.wait_us
    }
}

impl Stage for OrderingBarrier {
    fn name(&self) -> &str {
        &self.name
    }

    fn tick(&mut self, _now_ns: u64) {}

    fn can_push(&self) -> bool {
        true
    }

    fn push(&mut self, mut event: Event, now_ns: u64) {
        event.enter_stage(now_ns);
        let id = event.id();
        let previous = self.waiting.insert(id, event);
        assert!(
            previous.is_none(),
            "barrier '{}' received event {id} twice",
            self.name
        );
    }

    fn can_pop(&self) -> bool {
        self.waiting
            .first_key_value()
            .is_some_and(|(&id, _)| id == self.watermark.next())
    }

    fn pop(&mut self, now_ns: u64) -> Event {
        let (id, event) = self
            .waiting
            .pop_first()
            .unwrap_or_else(|| panic!("barrier '{}' popped while empty", self.name));

        assert!(
            id == self.watermark.next(),
            "barrier '{}' released {id} out of order: watermark is {}",
            self.name,
            self.watermark
        );

        self.wait_us.add(ns_to_us(event.stage_duration(now_ns)));
        self.watermark = id;
        event
    }

    fn occupancy(&self) -> usize {
        self.waiting.len()
    }

    fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            name: self.name.clone(),
            kind: StageKind::OrderingBarrier,
            occupancy: self.waiting.len(),
            released: self.wait_us.count(),
            stage_time_p90_us: self.wait_us.percentile(90).ok().flatten(),
            workers: None,
            watermark: Some(self.watermark),
        }
    }
}

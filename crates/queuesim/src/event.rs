//! Events circulating through the pipeline.
//!
//! An [`Event`] is a lightweight token: an id, the time it was created and
//! the time it entered its current stage. Ids come from an [`EventIds`]
//! allocator owned by the pipeline, so every simulation has its own dense,
//! strictly increasing id sequence starting at 1. The ordering barrier
//! depends on that density: it releases id `n` only after `n - 1`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique, strictly increasing event identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct EventId(u64);

impl EventId {
    /// Creates an event id from a raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The id that must be released right after this one.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Optional source/destination labels.
///
/// Carried through every stage untouched; the scheduler never looks at them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub src: u64,
    pub dst: u64,
}

/// A token flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    id: EventId,
    created_at_ns: u64,
    stage_entered_ns: u64,
    route: Option<Route>,
}

impl Event {
    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn created_at_ns(&self) -> u64 {
        self.created_at_ns
    }

    pub fn stage_entered_ns(&self) -> u64 {
        self.stage_entered_ns
    }

    pub fn route(&self) -> Option<Route> {
        self.route
    }

    /// Time since the event was created.
    pub fn duration(&self, now_ns: u64) -> u64 {
        now_ns.saturating_sub(self.created_at_ns)
    }

    /// Time since the event entered its current stage.
    pub fn stage_duration(&self, now_ns: u64) -> u64 {
        now_ns.saturating_sub(self.stage_entered_ns)
    }

    /// Marks the event as having entered a new stage at `now_ns`.
    pub fn enter_stage(&mut self, now_ns: u64) {
        self.stage_entered_ns = now_ns;
    }
}

/// Allocator for event ids.
///
/// The only way to create an [`Event`]. Ids start at 1 and are never reused,
/// so an event created later always has the larger id.
#[derive(Debug, Clone)]
pub struct EventIds {
    next: u64,
}

impl EventIds {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Creates an unlabeled event at `now_ns`.
    pub fn create(&mut self, now_ns: u64) -> Event {
        self.create_with_route(now_ns, None)
    }

    /// Creates an event carrying source/destination labels.
    pub fn create_labeled(&mut self, now_ns: u64, src: u64, dst: u64) -> Event {
        self.create_with_route(now_ns, Some(Route { src, dst }))
    }

    /// Number of events created so far.
    pub fn issued(&self) -> u64 {
        self.next - 1
    }

    fn create_with_route(&mut self, now_ns: u64, route: Option<Route>) -> Event {
        let id = EventId(self.next);
        self.next = self.next.checked_add(1).expect("event id overflow");
        Event {
            id,
            created_at_ns: now_ns,
            stage_entered_ns: now_ns,
            route,
        }
    }
}

impl Default for EventIds {
    fn default() -> Self {
        Self::new()
    }
}

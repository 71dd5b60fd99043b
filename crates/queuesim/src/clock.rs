//! Simulated time.
//!
//! Time is a nanosecond counter that advances only when the driver asks it
//! to. Nothing in the crate reads wall-clock time, so a run is a pure function
//! of its configuration, its seed and the sequence of `tick` deltas.
//!
//! The pipeline owns its [`SimClock`] and hands `now` to every stage
//! operation explicitly; there is no process-wide clock.

/// Nanoseconds per microsecond.
pub const NS_PER_US: u64 = 1_000;
/// Nanoseconds per millisecond.
pub const NS_PER_MS: u64 = 1_000_000;
/// Nanoseconds per second.
pub const NS_PER_SEC: u64 = 1_000_000_000;

/// Converts microseconds to nanoseconds.
#[inline]
pub const fn us_to_ns(us: u64) -> u64 {
    us * NS_PER_US
}

/// Converts milliseconds to nanoseconds.
#[inline]
pub const fn ms_to_ns(ms: u64) -> u64 {
    ms * NS_PER_MS
}

/// Converts seconds to nanoseconds.
#[inline]
pub const fn sec_to_ns(sec: u64) -> u64 {
    sec * NS_PER_SEC
}

/// Converts nanoseconds to whole microseconds (truncating).
#[inline]
pub const fn ns_to_us(ns: u64) -> u64 {
    ns / NS_PER_US
}

/// Converts nanoseconds to fractional seconds.
#[inline]
pub fn ns_to_sec(ns: u64) -> f64 {
    ns as f64 / NS_PER_SEC as f64
}

/// Deterministic discrete clock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimClock {
    now_ns: u64,
}

impl SimClock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self { now_ns: 0 }
    }

    /// Creates a clock starting at `now_ns`.
    pub fn at(now_ns: u64) -> Self {
        Self { now_ns }
    }

    /// Current simulated time in nanoseconds.
    #[inline]
    pub fn now(&self) -> u64 {
        self.now_ns
    }

    /// Advances the clock by `delta_ns`.
    ///
    /// # Panics
    ///
    /// Panics if the clock would overflow `u64`.
    pub fn advance_by(&mut self, delta_ns: u64) {
        self.now_ns = self.now_ns.checked_add(delta_ns).expect("clock overflow");
    }

    /// Moves the clock to an absolute time.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `time_ns` is before the current time.
    pub fn advance_to(&mut self, time_ns: u64) {
        debug_assert!(
            time_ns >= self.now_ns,
            "time cannot go backwards: current={}, target={}",
            self.now_ns,
            time_ns
        );
        self.now_ns = time_ns;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_clock_starts_at_zero() {
        let clock = SimClock::new();
        assert_eq!(clock.now(), 0);
    }

    #[test]
    fn sim_clock_advance_by_accumulates() {
        let mut clock = SimClock::new();
        clock.advance_by(us_to_ns(1));
        clock.advance_by(500);
        assert_eq!(clock.now(), 1_500);
    }

    #[test]
    fn sim_clock_advance_to() {
        let mut clock = SimClock::at(1_000);
        clock.advance_to(ms_to_ns(5));
        assert_eq!(clock.now(), 5_000_000);
    }

    #[test]
    #[should_panic(expected = "time cannot go backwards")]
    fn sim_clock_advance_to_past_panics() {
        let mut clock = SimClock::at(5_000_000);
        clock.advance_to(1_000_000);
    }

    #[test]
    #[should_panic(expected = "clock overflow")]
    fn sim_clock_overflow_panics() {
        let mut clock = SimClock::at(u64::MAX);
        clock.advance_by(1);
    }

    #[test]
    fn unit_conversions() {
        assert_eq!(us_to_ns(3), 3_000);
        assert_eq!(ms_to_ns(2), 2_000_000);
        assert_eq!(sec_to_ns(1), NS_PER_SEC);
        assert_eq!(ns_to_us(2_999), 2);
        assert!((ns_to_sec(1_500_000_000) - 1.5).abs() < f64::EPSILON);
    }
}

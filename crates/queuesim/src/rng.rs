//! Injectable randomness for sampled service times.
//!
//! Stages never reach for a global or thread-local generator. Each
//! percentile-sampling worker pool owns a `Box<dyn Rng>` handed to it at
//! construction; the pipeline forks one stream per pool from a single seeded
//! [`SimRng`], so a seed fully determines every draw of the run.
//!
//! ```text
//! master SimRng (seed)
//!   ├─> pool "NVMe"   (forked)
//!   └─> pool "Remote" (forked)
//! ```

use rand::rngs::SmallRng;
use rand::{Rng as _, RngCore, SeedableRng};

/// Source of uniform random numbers.
pub trait Rng: Send {
    /// Generates a random `u64`.
    fn next_u64(&mut self) -> u64;

    /// Generates a random `f64` in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64;

    /// Generates a random percentage in `[0.0, 100.0)`.
    #[inline]
    fn next_percent(&mut self) -> f64 {
        self.next_f64() * 100.0
    }

    /// Derives an independent stream from this one.
    fn fork(&mut self) -> Box<dyn Rng>;
}

/// Deterministic, seedable generator.
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: SmallRng,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: SmallRng::seed_from_u64(seed),
        }
    }

    /// Forks a child generator with a seed drawn from this one.
    pub fn fork_sim(&mut self) -> SimRng {
        SimRng::new(self.inner.next_u64())
    }
}

impl Rng for SimRng {
    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    #[inline]
    fn next_f64(&mut self) -> f64 {
        self.inner.r#gen()
    }

    fn fork(&mut self) -> Box<dyn Rng> {
        Box::new(self.fork_sim())
    }
}

//! Refresh jitter
//!
//! Banner refreshes are spread over a randomized interval. The source of
//! randomness is injected so tests can pin it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait IntervalSource: Send {
    /// Draw an interval in `[min_ms, max_ms]`.
    fn next_interval_ms(&mut self, min_ms: i64, max_ms: i64) -> i64;
}

/// `StdRng`-backed jitter.
pub struct SeededJitter {
    rng: StdRng,
}

impl SeededJitter {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SeededJitter {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl IntervalSource for SeededJitter {
    fn next_interval_ms(&mut self, min_ms: i64, max_ms: i64) -> i64 {
        if min_ms >= max_ms {
            return min_ms;
        }
        self.rng.gen_range(min_ms..=max_ms)
    }
}

/// Always returns the same interval, clamped into the requested window.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval(pub i64);

impl IntervalSource for FixedInterval {
    fn next_interval_ms(&mut self, min_ms: i64, max_ms: i64) -> i64 {
        self.0.clamp(min_ms, max_ms.max(min_ms))
    }
}

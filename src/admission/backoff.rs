//! Exponential backoff after consecutive load failures.
//!
//! cooldown(k) = base * min(2^(k-1), max_multiplier) for k > 0, zero otherwise.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base_ms: i64,
    max_multiplier: u32,
}

impl Backoff {
    pub fn new(base_ms: i64, max_multiplier: u32) -> Self {
        Self {
            base_ms: base_ms.max(0),
            max_multiplier: max_multiplier.max(1),
        }
    }

    /// Cooldown owed after `consecutive_failures` failures in a row.
    pub fn cooldown_ms(&self, consecutive_failures: u32) -> i64 {
        if consecutive_failures == 0 {
            return 0;
        }
        let exponent = consecutive_failures - 1;
        let multiplier = if exponent >= 31 {
            self.max_multiplier
        } else {
            (1u32 << exponent).min(self.max_multiplier)
        };
        self.base_ms.saturating_mul(multiplier as i64)
    }

    /// Milliseconds left on the cooldown, or `None` once it has elapsed.
    pub fn remaining_ms(&self, now_ms: i64, last_failure_at: Option<i64>, consecutive_failures: u32) -> Option<i64> {
        let cooldown = self.cooldown_ms(consecutive_failures);
        if cooldown == 0 {
            return None;
        }
        let elapsed = (now_ms - last_failure_at?).max(0);
        if elapsed < cooldown {
            Some(cooldown - elapsed)
        } else {
            None
        }
    }
}

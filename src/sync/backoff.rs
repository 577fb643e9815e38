//! Retry pacing for contended multi-lock rounds.
//!
//! A [`Backoff`] walks through three stages as `snooze` is called
//! repeatedly: exponential busy-spinning, thread yields, then sleeps that
//! double up to a cap. Sleeps carry a deterministic jitter (xorshift64) so
//! threads that collide once do not keep colliding in lockstep.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;
use std::time::Duration;

use crate::config::{BackoffConfig, MAX_SPIN_LIMIT};

/// Stateful pacing helper driven by a [`BackoffConfig`].
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    step: u32,
    rng: u64,
}

impl Backoff {
    /// Creates a backoff at its first (shortest) step.
    #[must_use]
    pub fn new(config: BackoffConfig) -> Self {
        let rng = config.jitter_seed;
        Self {
            config,
            step: 0,
            rng,
        }
    }

    /// Creates a backoff whose jitter stream is mixed with the current
    /// thread's identity, so contending threads sleep for different spans.
    #[must_use]
    pub fn for_current_thread(config: BackoffConfig) -> Self {
        let mut backoff = Self::new(config);
        if backoff.rng != 0 {
            let mut hasher = DefaultHasher::new();
            thread::current().id().hash(&mut hasher);
            backoff.rng ^= hasher.finish();
            if backoff.rng == 0 {
                backoff.rng = backoff.config.jitter_seed;
            }
        }
        backoff
    }

    /// Number of times `snooze` has been called since creation or reset.
    #[inline]
    #[must_use]
    pub fn step(&self) -> u32 {
        self.step
    }

    /// Returns true once spinning and yielding are exhausted.
    #[must_use]
    pub fn is_sleeping(&self) -> bool {
        self.step >= self.config.spin_limit.saturating_add(self.config.yield_limit)
    }

    /// Returns to the first step.
    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// Waits for the current step, then advances.
    pub fn snooze(&mut self) {
        let spin_limit = self.config.spin_limit;
        let yield_end = spin_limit.saturating_add(self.config.yield_limit);

        if self.step < spin_limit {
            for _ in 0..(1u32 << self.step.min(MAX_SPIN_LIMIT)) {
                std::hint::spin_loop();
            }
        } else if self.step < yield_end {
            thread::yield_now();
        } else {
            thread::sleep(self.sleep_for(self.step - yield_end));
        }

        self.step = self.step.saturating_add(1);
    }

    /// Sleep duration for the `n`th sleeping round: `min_sleep * 2^n`,
    /// capped at `max_sleep`, jittered into `[d/2, d]`.
    fn sleep_for(&mut self, n: u32) -> Duration {
        let factor = 1u32 << n.min(16);
        let base = self
            .config
            .min_sleep
            .saturating_mul(factor)
            .min(self.config.max_sleep);

        if self.rng == 0 {
            return base;
        }

        let half = base / 2;
        let span = u64::try_from((base - half).as_nanos()).unwrap_or(u64::MAX);
        if span == 0 {
            return base;
        }
        half + Duration::from_nanos(self.next_random() % (span + 1))
    }

    fn next_random(&mut self) -> u64 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng = x;
        x
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

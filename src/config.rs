//! Configuration for retry pacing.
//!
//! The only tunable in lockwork is how a multi-lock request paces itself
//! between failed rounds. [`BackoffConfig`] describes that schedule: a few
//! rounds of busy spinning, then rounds that yield the thread, then sleeps
//! that double from `min_sleep` up to `max_sleep`.
//!
//! # Example
//!
//! ```
//! use lockwork::config::BackoffConfig;
//! use std::time::Duration;
//!
//! let config = BackoffConfig {
//!     max_sleep: Duration::from_millis(2),
//!     ..BackoffConfig::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

/// Largest accepted `spin_limit`; spin rounds double, so this bounds a
/// single round at `2^16` spin hints.
pub const MAX_SPIN_LIMIT: u32 = 16;

/// Retry pacing for deadlock-avoiding multi-resource acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Number of initial rounds that busy-spin; round `i` spins `2^i` times.
    pub spin_limit: u32,
    /// Number of rounds after spinning that only yield the thread.
    pub yield_limit: u32,
    /// First sleep once spinning and yielding are exhausted.
    pub min_sleep: Duration,
    /// Upper bound on a single sleep.
    pub max_sleep: Duration,
    /// Seed for sleep jitter. Zero disables jitter.
    pub jitter_seed: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            spin_limit: 6,
            yield_limit: 10,
            min_sleep: Duration::from_micros(50),
            max_sleep: Duration::from_millis(1),
            jitter_seed: 0x9E37_79B9_7F4A_7C15,
        }
    }
}

impl BackoffConfig {
    /// Short spins and short sleeps, for critical sections measured in
    /// microseconds.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            spin_limit: 3,
            yield_limit: 4,
            min_sleep: Duration::from_micros(10),
            max_sleep: Duration::from_micros(200),
            ..Self::default()
        }
    }

    /// No spinning and longer sleeps, for contended resources held across
    /// slow work.
    #[must_use]
    pub fn low_cpu() -> Self {
        Self {
            spin_limit: 0,
            yield_limit: 2,
            min_sleep: Duration::from_micros(100),
            max_sleep: Duration::from_millis(5),
            ..Self::default()
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spin_limit > MAX_SPIN_LIMIT {
            return Err(ConfigError::SpinLimitTooLarge(self.spin_limit));
        }

        if self.min_sleep.is_zero() {
            return Err(ConfigError::ZeroSleep);
        }

        if self.max_sleep < self.min_sleep {
            return Err(ConfigError::SleepRangeInverted {
                min: self.min_sleep,
                max: self.max_sleep,
            });
        }

        Ok(())
    }
}

/// Error returned by [`BackoffConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `spin_limit` exceeds [`MAX_SPIN_LIMIT`].
    #[error("spin_limit {0} exceeds maximum of {MAX_SPIN_LIMIT}")]
    SpinLimitTooLarge(u32),
    /// `min_sleep` is zero, so sleeping rounds would never grow.
    #[error("min_sleep must be non-zero")]
    ZeroSleep,
    /// `max_sleep` is below `min_sleep`.
    #[error("max_sleep {max:?} is below min_sleep {min:?}")]
    SleepRangeInverted {
        /// Configured minimum.
        min: Duration,
        /// Configured maximum.
        max: Duration,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_validate() {
        assert!(BackoffConfig::default().validate().is_ok());
        assert!(BackoffConfig::aggressive().validate().is_ok());
        assert!(BackoffConfig::low_cpu().validate().is_ok());
    }

    #[test]
    fn rejects_spin_limit_overflow() {
        let config = BackoffConfig {
            spin_limit: MAX_SPIN_LIMIT + 1,
            ..BackoffConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::SpinLimitTooLarge(MAX_SPIN_LIMIT + 1))
        );
    }

    #[test]
    fn rejects_zero_sleep() {
        let config = BackoffConfig {
            min_sleep: Duration::ZERO,
            ..BackoffConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroSleep));
    }

    #[test]
    fn rejects_inverted_sleep_range() {
        let config = BackoffConfig {
            min_sleep: Duration::from_millis(2),
            max_sleep: Duration::from_millis(1),
            ..BackoffConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::SleepRangeInverted { .. }));
        assert!(err.to_string().contains("below min_sleep"));
    }
}

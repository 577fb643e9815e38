//! Feature-gated contention metrics for [`Mutex`](super::Mutex).
//!
//! With the `lock-metrics` feature each mutex counts acquisitions and
//! contended acquisitions, and accumulates wait and hold time. Without it
//! every type here is zero-sized and every call is a no-op; snapshots then
//! carry only the lock name.

/// Snapshot of lock contention metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockMetricsSnapshot {
    /// Human-readable name for this lock.
    pub name: &'static str,
    /// Total number of successful acquisitions.
    pub acquisitions: u64,
    /// Acquisitions that found the lock already held and had to park.
    pub contentions: u64,
    /// Cumulative nanoseconds spent waiting to acquire.
    pub wait_ns: u64,
    /// Cumulative nanoseconds the lock was held.
    pub hold_ns: u64,
    /// Longest single wait in nanoseconds.
    pub max_wait_ns: u64,
    /// Longest single hold in nanoseconds.
    pub max_hold_ns: u64,
}

#[cfg(feature = "lock-metrics")]
mod inner {
    use super::LockMetricsSnapshot;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Instant;

    /// Counters, split so acquire-path and release-path fields sit on
    /// different cache lines.
    #[derive(Debug)]
    #[repr(C)]
    pub(crate) struct LockMetrics {
        acquisitions: AtomicU64,
        contentions: AtomicU64,
        wait_ns: AtomicU64,
        max_wait_ns: AtomicU64,
        _pad: [u8; 32],
        hold_ns: AtomicU64,
        max_hold_ns: AtomicU64,
    }

    /// Started when an acquisition begins.
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct WaitTimer(Instant);

    /// Started when an acquisition completes.
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct HoldTimer(Instant);

    fn elapsed_ns(since: Instant) -> u64 {
        u64::try_from(since.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn update_max(current: &AtomicU64, value: u64) {
        current.fetch_max(value, Ordering::Relaxed);
    }

    impl LockMetrics {
        pub(crate) const fn new() -> Self {
            Self {
                acquisitions: AtomicU64::new(0),
                contentions: AtomicU64::new(0),
                wait_ns: AtomicU64::new(0),
                max_wait_ns: AtomicU64::new(0),
                _pad: [0; 32],
                hold_ns: AtomicU64::new(0),
                max_hold_ns: AtomicU64::new(0),
            }
        }

        #[inline]
        pub(crate) fn start_wait(&self) -> WaitTimer {
            WaitTimer(Instant::now())
        }

        #[inline]
        pub(crate) fn acquired(&self, wait: WaitTimer, contended: bool) -> HoldTimer {
            let wait_ns = elapsed_ns(wait.0);
            self.acquisitions.fetch_add(1, Ordering::Relaxed);
            self.wait_ns.fetch_add(wait_ns, Ordering::Relaxed);
            update_max(&self.max_wait_ns, wait_ns);
            if contended {
                self.contentions.fetch_add(1, Ordering::Relaxed);
            }
            HoldTimer(Instant::now())
        }

        #[inline]
        pub(crate) fn released(&self, hold: HoldTimer) {
            let hold_ns = elapsed_ns(hold.0);
            self.hold_ns.fetch_add(hold_ns, Ordering::Relaxed);
            update_max(&self.max_hold_ns, hold_ns);
        }

        pub(crate) fn snapshot(&self, name: &'static str) -> LockMetricsSnapshot {
            LockMetricsSnapshot {
                name,
                acquisitions: self.acquisitions.load(Ordering::Relaxed),
                contentions: self.contentions.load(Ordering::Relaxed),
                wait_ns: self.wait_ns.load(Ordering::Relaxed),
                hold_ns: self.hold_ns.load(Ordering::Relaxed),
                max_wait_ns: self.max_wait_ns.load(Ordering::Relaxed),
                max_hold_ns: self.max_hold_ns.load(Ordering::Relaxed),
            }
        }

        pub(crate) fn reset(&self) {
            self.acquisitions.store(0, Ordering::Relaxed);
            self.contentions.store(0, Ordering::Relaxed);
            self.wait_ns.store(0, Ordering::Relaxed);
            self.hold_ns.store(0, Ordering::Relaxed);
            self.max_wait_ns.store(0, Ordering::Relaxed);
            self.max_hold_ns.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(not(feature = "lock-metrics"))]
mod inner {
    use super::LockMetricsSnapshot;

    #[derive(Debug)]
    pub(crate) struct LockMetrics;

    #[derive(Debug, Clone, Copy)]
    pub(crate) struct WaitTimer;

    #[derive(Debug, Clone, Copy)]
    pub(crate) struct HoldTimer;

    impl LockMetrics {
        pub(crate) const fn new() -> Self {
            Self
        }

        #[inline]
        pub(crate) fn start_wait(&self) -> WaitTimer {
            WaitTimer
        }

        #[inline]
        pub(crate) fn acquired(&self, _wait: WaitTimer, _contended: bool) -> HoldTimer {
            HoldTimer
        }

        #[inline]
        pub(crate) fn released(&self, _hold: HoldTimer) {}

        pub(crate) fn snapshot(&self, name: &'static str) -> LockMetricsSnapshot {
            LockMetricsSnapshot {
                name,
                ..Default::default()
            }
        }

        pub(crate) fn reset(&self) {}
    }
}

pub(crate) use inner::{HoldTimer, LockMetrics, WaitTimer};

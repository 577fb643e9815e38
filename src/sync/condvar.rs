//! Condition variable paired with a [`Mutex`].
//!
//! A [`Condvar`] parks threads until another thread signals that shared
//! state protected by a mutex has changed. The wait operations take the
//! caller's [`MutexGuard`], release the mutex while parked, and hold it again
//! when they return.
//!
//! # Holding the mutex
//!
//! Every operation takes a guard, so "the caller holds the paired mutex" is
//! checked by the compiler. While threads are parked, the condvar is bound to
//! the mutex they waited with; a guard of any other mutex panics with
//! [`ContractViolation::CondvarMutexMismatch`]. Once the queue is empty the
//! binding lapses, so the pair may be moved (for example into an `Arc`) and
//! the condvar reused with another mutex.
//!
//! # Lost wake-ups
//!
//! A waiter enqueues its ticket before it releases the mutex, and notifiers
//! hold the mutex. A notification therefore either happens before the
//! waiter enqueued (and the waiter's predicate check already saw the new
//! state) or it finds the waiter in the queue.
//!
//! # Example
//!
//! ```
//! use lockwork::sync::{Condvar, Mutex};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let state = Arc::new((Mutex::new(false), Condvar::new()));
//! let setter = Arc::clone(&state);
//! let handle = thread::spawn(move || {
//!     let (ready, cv) = &*setter;
//!     let mut guard = ready.lock();
//!     *guard = true;
//!     cv.notify_all(&guard);
//! });
//!
//! let (ready, cv) = &*state;
//! let mut guard = ready.lock();
//! cv.wait_until(&mut guard, |ready| *ready);
//! assert!(*guard);
//! # drop(guard);
//! # handle.join().unwrap();
//! ```

use parking_lot::{Condvar as ParkingCondvar, Mutex as ParkingMutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::mutex::MutexGuard;
use crate::error::ContractViolation;

/// Result of a timed wait on a condition variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeoutResult {
    timed_out: bool,
}

impl WaitTimeoutResult {
    /// Returns whether the wait gave up with the condition still false.
    #[inline]
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }
}

#[derive(Debug, Default)]
struct CondvarState {
    /// Address of the mutex the parked waiters use. Only meaningful while
    /// `queue` is non-empty: a waiter borrows its guard, so that mutex
    /// cannot move or be dropped until the queue drains.
    mutex: usize,
    /// Tickets of parked waiters, oldest first.
    queue: VecDeque<u64>,
    next_ticket: u64,
}

/// A condition variable for coordinating threads around a [`Mutex`](super::Mutex).
#[derive(Debug, Default)]
pub struct Condvar {
    state: ParkingMutex<CondvarState>,
    /// Parked waiters sleep here and re-check whether their ticket left the queue.
    wakeup: ParkingCondvar,
}

impl Condvar {
    /// Creates a new condition variable.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads currently parked on this condvar.
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Releases the mutex, parks until notified, then re-acquires the mutex.
    ///
    /// A return does not mean the awaited condition holds: a notification
    /// meant for another predicate wakes this thread too. Prefer
    /// [`Condvar::wait_until`].
    #[track_caller]
    pub fn wait<T>(&self, guard: &mut MutexGuard<'_, T>) {
        self.park(guard, None);
    }

    /// Blocks until `condition` returns true, re-checking it with the mutex
    /// held after every wake-up.
    ///
    /// Returns at once, without parking, when the condition already holds.
    #[track_caller]
    pub fn wait_until<T, F>(&self, guard: &mut MutexGuard<'_, T>, mut condition: F)
    where
        F: FnMut(&mut T) -> bool,
    {
        while !condition(&mut **guard) {
            self.park(guard, None);
        }
    }

    /// Like [`Condvar::wait_until`], but gives up after `timeout`.
    ///
    /// The mutex is held again on return either way. The result reports a
    /// timeout only when the condition is still false at that point.
    #[track_caller]
    pub fn wait_timeout_until<T, F>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        timeout: Duration,
        mut condition: F,
    ) -> WaitTimeoutResult
    where
        F: FnMut(&mut T) -> bool,
    {
        let deadline = Instant::now().checked_add(timeout);
        while !condition(&mut **guard) {
            if self.park(guard, deadline) {
                return WaitTimeoutResult {
                    timed_out: !condition(&mut **guard),
                };
            }
        }
        WaitTimeoutResult { timed_out: false }
    }

    /// Wakes the longest-waiting parked thread, if any.
    #[track_caller]
    pub fn notify_one<T>(&self, guard: &MutexGuard<'_, T>) {
        let mut state = self.state.lock();
        Self::bind(&mut state, guard);
        if state.queue.pop_front().is_some() {
            drop(state);
            self.wakeup.notify_all();
        }
    }

    /// Wakes every parked thread.
    #[track_caller]
    pub fn notify_all<T>(&self, guard: &MutexGuard<'_, T>) {
        let mut state = self.state.lock();
        Self::bind(&mut state, guard);
        if !state.queue.is_empty() {
            state.queue.clear();
            drop(state);
            self.wakeup.notify_all();
        }
    }

    #[track_caller]
    fn bind<T>(state: &mut CondvarState, guard: &MutexGuard<'_, T>) {
        let addr = MutexGuard::mutex(guard).addr();
        if state.queue.is_empty() {
            state.mutex = addr;
        } else if state.mutex != addr {
            ContractViolation::CondvarMutexMismatch.raise();
        }
    }

    /// Parks until this waiter's ticket is dequeued by a notify or the
    /// deadline passes. Returns true on timeout.
    #[track_caller]
    fn park<T>(&self, guard: &mut MutexGuard<'_, T>, deadline: Option<Instant>) -> bool {
        let mut state = self.state.lock();
        Self::bind(&mut state, guard);

        let ticket = state.next_ticket;
        state.next_ticket = state.next_ticket.wrapping_add(1);
        state.queue.push_back(ticket);

        // Release only after enqueueing; notifiers need the mutex first.
        guard.release_for_wait();

        let mut timed_out = false;
        while state.queue.contains(&ticket) {
            match deadline {
                Some(deadline) => {
                    if self.wakeup.wait_until(&mut state, deadline).timed_out() {
                        if let Some(pos) = state.queue.iter().position(|t| *t == ticket) {
                            state.queue.remove(pos);
                            timed_out = true;
                        }
                        break;
                    }
                }
                None => self.wakeup.wait(&mut state),
            }
        }
        drop(state);

        guard.reacquire_after_wait();
        timed_out
    }
}

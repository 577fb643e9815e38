//! Blocking mutex with scoped guards.
//!
//! [`Mutex<T>`] owns the data it protects. [`Mutex::lock`] parks the calling
//! thread until the lock is free and returns a [`MutexGuard`]; dropping the
//! guard releases the lock on every exit path, including early returns and
//! panic unwinding. There is no poisoning: after a panic inside a critical
//! section the mutex is simply free again.
//!
//! # Ownership tracking
//!
//! The mutex records which thread holds it. This turns the classic
//! non-reentrant-mutex bugs into immediate, diagnosable panics:
//!
//! - [`Mutex::lock`] called by the holder panics with
//!   [`ContractViolation::Relock`] instead of deadlocking.
//! - [`Mutex::force_unlock`] called by any thread other than the holder
//!   panics with [`ContractViolation::UnlockNotOwner`].
//!
//! [`Mutex::try_lock`] never blocks and never panics; it reports
//! [`TryLockError::HeldByCurrentThread`] for the re-entrant case.
//!
//! Guards are `!Send`: a lock is released by the thread that acquired it.
//!
//! # Example
//!
//! ```
//! use lockwork::sync::Mutex;
//!
//! let mutex = Mutex::new(41);
//! {
//!     let mut guard = mutex.lock();
//!     *guard += 1;
//! } // released here
//! assert_eq!(*mutex.lock(), 42);
//! ```

#![allow(unsafe_code)]

use parking_lot::{Condvar as ParkingCondvar, Mutex as ParkingMutex};
use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::thread::{self, ThreadId};

use super::metrics::{HoldTimer, LockMetrics, LockMetricsSnapshot};
use crate::error::ContractViolation;

/// Error returned when trying to lock without waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryLockError {
    /// Another thread holds the mutex.
    Locked,
    /// The calling thread already holds the mutex.
    HeldByCurrentThread,
}

impl std::fmt::Display for TryLockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked => write!(f, "mutex is locked"),
            Self::HeldByCurrentThread => write!(f, "mutex is already held by this thread"),
        }
    }
}

impl std::error::Error for TryLockError {}

#[derive(Debug)]
struct MutexState {
    /// Whether the mutex is currently locked.
    locked: bool,
    /// Thread holding the lock while `locked` is true.
    owner: Option<ThreadId>,
    /// Threads parked in `lock`.
    waiters: usize,
}

/// A blocking mutual-exclusion lock protecting a value of type `T`.
pub struct Mutex<T> {
    state: ParkingMutex<MutexState>,
    /// Signalled when the lock is released and someone is parked.
    available: ParkingCondvar,
    metrics: LockMetrics,
    name: &'static str,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is serialized by `state.locked`.
unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    /// Creates a new mutex in an unlocked state.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::named("mutex", value)
    }

    /// Creates a new unlocked mutex with a name used in metrics snapshots.
    #[must_use]
    pub fn named(name: &'static str, value: T) -> Self {
        Self {
            state: ParkingMutex::new(MutexState {
                locked: false,
                owner: None,
                waiters: 0,
            }),
            available: ParkingCondvar::new(),
            metrics: LockMetrics::new(),
            name,
            data: UnsafeCell::new(value),
        }
    }

    /// Returns the name given at construction.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true if some thread currently holds the mutex.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    /// Returns true if the calling thread holds the mutex.
    #[must_use]
    pub fn is_owned_by_current_thread(&self) -> bool {
        let state = self.state.lock();
        state.locked && state.owner == Some(thread::current().id())
    }

    /// Returns the number of threads parked waiting for the lock.
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.state.lock().waiters
    }

    /// Acquires the mutex, parking the calling thread until it is free.
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::Relock`] if the calling thread
    /// already holds the mutex.
    #[track_caller]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        let hold = self.acquire();
        MutexGuard::new(self, hold)
    }

    /// Tries to acquire the mutex without blocking.
    pub fn try_lock(&self) -> Result<MutexGuard<'_, T>, TryLockError> {
        let wait = self.metrics.start_wait();
        let me = thread::current().id();

        let mut state = self.state.lock();
        if state.locked {
            return Err(if state.owner == Some(me) {
                TryLockError::HeldByCurrentThread
            } else {
                TryLockError::Locked
            });
        }

        state.locked = true;
        state.owner = Some(me);
        drop(state);

        let hold = self.metrics.acquired(wait, false);
        Ok(MutexGuard::new(self, hold))
    }

    /// Releases the mutex without a guard.
    ///
    /// # Safety
    ///
    /// The guard for the current hold must have been leaked (for example
    /// with [`std::mem::forget`]) and must not be used afterwards.
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::ReleaseUnheld`] if the mutex is not
    /// locked, or [`ContractViolation::UnlockNotOwner`] if another thread
    /// holds it. The mutex state is left untouched in both cases.
    #[track_caller]
    pub unsafe fn force_unlock(&self) {
        let wake = {
            let mut state = self.state.lock();
            if !state.locked {
                drop(state);
                ContractViolation::ReleaseUnheld.raise();
            }
            if state.owner != Some(thread::current().id()) {
                drop(state);
                ContractViolation::UnlockNotOwner.raise();
            }
            state.locked = false;
            state.owner = None;
            state.waiters > 0
        };
        if wake {
            self.available.notify_one();
        }
    }

    /// Returns a mutable reference to the underlying data.
    ///
    /// No locking is needed: the exclusive borrow proves no guard exists.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consumes the mutex, returning the underlying data.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Returns a snapshot of contention metrics.
    ///
    /// Counters are only maintained with the `lock-metrics` feature; without
    /// it the snapshot carries the name and zeroes.
    #[must_use]
    pub fn metrics(&self) -> LockMetricsSnapshot {
        self.metrics.snapshot(self.name)
    }

    /// Resets contention metrics to zero.
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    #[track_caller]
    fn acquire(&self) -> HoldTimer {
        let wait = self.metrics.start_wait();
        let me = thread::current().id();

        let mut state = self.state.lock();
        if state.locked && state.owner == Some(me) {
            drop(state);
            ContractViolation::Relock.raise();
        }

        let contended = state.locked;
        if contended {
            state.waiters += 1;
            while state.locked {
                self.available.wait(&mut state);
            }
            state.waiters -= 1;
        }

        state.locked = true;
        state.owner = Some(me);
        drop(state);

        self.metrics.acquired(wait, contended)
    }

    /// Release path for guards, which prove ownership by existing.
    #[inline]
    #[track_caller]
    fn release(&self, hold: HoldTimer) {
        let wake = {
            let mut state = self.state.lock();
            if !state.locked {
                drop(state);
                ContractViolation::ReleaseUnheld.raise();
            }
            state.locked = false;
            state.owner = None;
            state.waiters > 0
        };
        self.metrics.released(hold);
        // Notify outside the state lock so the woken thread can take it at once.
        if wake {
            self.available.notify_one();
        }
    }

    /// Address used to identify this mutex when pairing with a condvar.
    #[inline]
    pub(crate) fn addr(&self) -> usize {
        std::ptr::from_ref(self).cast::<()>() as usize
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Mutex<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut d = f.debug_struct("Mutex");
        d.field("name", &self.name);
        match self.try_lock() {
            Ok(guard) => d.field("data", &&*guard),
            Err(_) => d.field("data", &format_args!("<locked>")),
        };
        d.finish_non_exhaustive()
    }
}

/// A guard that releases the mutex when dropped.
#[must_use = "guard will be immediately released if not held"]
pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
    hold: HoldTimer,
    /// Guards must be dropped on the thread that acquired them.
    _not_send: PhantomData<*const ()>,
}

unsafe impl<T: Sync> Sync for MutexGuard<'_, T> {}

impl<'a, T> MutexGuard<'a, T> {
    fn new(mutex: &'a Mutex<T>, hold: HoldTimer) -> Self {
        Self {
            mutex,
            hold,
            _not_send: PhantomData,
        }
    }

    /// Returns the mutex this guard holds.
    ///
    /// An associated function so it cannot shadow methods of `T`.
    #[must_use]
    pub fn mutex(guard: &Self) -> &'a Mutex<T> {
        guard.mutex
    }

    /// Temporarily releases the mutex while running `f`, then re-acquires it.
    ///
    /// The mutex is re-acquired even if `f` panics, so the guard is always
    /// valid when it is dropped.
    pub fn unlocked<F, U>(guard: &mut Self, f: F) -> U
    where
        F: FnOnce() -> U,
    {
        struct Relock<'g, 'a, T> {
            guard: &'g mut MutexGuard<'a, T>,
        }

        impl<T> Drop for Relock<'_, '_, T> {
            fn drop(&mut self) {
                self.guard.hold = self.guard.mutex.acquire();
            }
        }

        guard.mutex.release(guard.hold);
        let _relock = Relock { guard };
        f()
    }

    /// Releases the lock while the guard stays borrowed by a waiter.
    pub(crate) fn release_for_wait(&mut self) {
        self.mutex.release(self.hold);
    }

    /// Re-acquires the lock released by [`Self::release_for_wait`].
    pub(crate) fn reacquire_after_wait(&mut self) {
        self.hold = self.mutex.acquire();
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for MutexGuard<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutexGuard").field("data", &**self).finish()
    }
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.release(self.hold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn init_test(test_name: &str) {
        init_test_logging();
        crate::test_phase!(test_name);
    }

    #[test]
    fn new_mutex_is_unlocked() {
        init_test("new_mutex_is_unlocked");
        let mutex = Mutex::new(42);
        let unlocked = !mutex.is_locked();
        crate::assert_with_log!(unlocked, "mutex should start unlocked", true, unlocked);
        let waiters = mutex.waiters();
        crate::assert_with_log!(waiters == 0, "no waiters", 0usize, waiters);
        crate::test_complete!("new_mutex_is_unlocked");
    }

    #[test]
    fn lock_acquires_mutex() {
        init_test("lock_acquires_mutex");
        let mutex = Mutex::new(42);

        let guard = mutex.lock();
        crate::assert_with_log!(*guard == 42, "guard should deref", 42, *guard);
        let owned = mutex.is_owned_by_current_thread();
        crate::assert_with_log!(owned, "owned by this thread", true, owned);

        drop(guard);
        let owned = mutex.is_owned_by_current_thread();
        crate::assert_with_log!(!owned, "released after drop", false, owned);
        crate::test_complete!("lock_acquires_mutex");
    }

    #[test]
    fn test_mutex_try_lock_success() {
        init_test("test_mutex_try_lock_success");
        let mutex = Mutex::new(42);

        let mut guard = mutex.try_lock().expect("try_lock should succeed");
        *guard = 100;
        drop(guard);

        let value = *mutex.lock();
        crate::assert_with_log!(value == 100, "write persisted", 100, value);
        crate::test_complete!("test_mutex_try_lock_success");
    }

    #[test]
    fn test_mutex_try_lock_reports_current_holder() {
        init_test("test_mutex_try_lock_reports_current_holder");
        let mutex = Mutex::new(0);
        let _guard = mutex.lock();

        let err = mutex.try_lock().unwrap_err();
        crate::assert_with_log!(
            err == TryLockError::HeldByCurrentThread,
            "re-entrant try_lock",
            TryLockError::HeldByCurrentThread,
            err
        );
        crate::test_complete!("test_mutex_try_lock_reports_current_holder");
    }

    #[test]
    fn test_mutex_try_lock_fail_from_other_thread() {
        init_test("test_mutex_try_lock_fail_from_other_thread");
        let mutex = Arc::new(Mutex::new(0));
        let _guard = mutex.lock();

        let contender = Arc::clone(&mutex);
        let err = thread::spawn(move || contender.try_lock().map(|_| ()).unwrap_err())
            .join()
            .expect("contender thread");
        crate::assert_with_log!(
            err == TryLockError::Locked,
            "other thread sees Locked",
            TryLockError::Locked,
            err
        );
        crate::test_complete!("test_mutex_try_lock_fail_from_other_thread");
    }

    #[test]
    #[should_panic(expected = "re-acquired by the thread that already holds it")]
    fn relock_by_owner_panics() {
        let mutex = Mutex::new(0);
        let _first = mutex.lock();
        let _second = mutex.lock();
    }

    #[test]
    fn relock_panic_leaves_mutex_usable() {
        init_test("relock_panic_leaves_mutex_usable");
        let mutex = Mutex::new(0);

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _first = mutex.lock();
            let _second = mutex.lock();
        }));
        crate::assert_with_log!(result.is_err(), "relock panicked", true, result.is_err());

        let locked = mutex.is_locked();
        crate::assert_with_log!(!locked, "first guard released on unwind", false, locked);
        let waiters = mutex.waiters();
        crate::assert_with_log!(waiters == 0, "no phantom waiter", 0usize, waiters);
        crate::test_complete!("relock_panic_leaves_mutex_usable");
    }

    #[test]
    fn test_mutex_drop_releases_lock() {
        init_test("test_mutex_drop_releases_lock");
        let mutex = Mutex::new(42);

        {
            let _guard = mutex.lock();
            let locked = mutex.is_locked();
            crate::assert_with_log!(locked, "locked in scope", true, locked);
        }

        let can_lock = mutex.try_lock().is_ok();
        crate::assert_with_log!(can_lock, "can lock after drop", true, can_lock);
        crate::test_complete!("test_mutex_drop_releases_lock");
    }

    #[test]
    fn early_return_releases_lock() {
        init_test("early_return_releases_lock");

        fn bump_if_even(mutex: &Mutex<u32>) -> Result<u32, &'static str> {
            let mut guard = mutex.lock();
            if *guard % 2 == 1 {
                return Err("odd");
            }
            *guard += 1;
            Ok(*guard)
        }

        let mutex = Mutex::new(0u32);
        assert_eq!(bump_if_even(&mutex), Ok(1));
        assert_eq!(bump_if_even(&mutex), Err("odd"));

        let locked = mutex.is_locked();
        crate::assert_with_log!(!locked, "released after early return", false, locked);
        crate::test_complete!("early_return_releases_lock");
    }

    #[test]
    fn panic_in_critical_section_releases_lock() {
        init_test("panic_in_critical_section_releases_lock");
        let mutex = Mutex::new(vec![1]);

        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut guard = mutex.lock();
            guard.push(2);
            panic!("boom");
        }));
        crate::assert_with_log!(result.is_err(), "closure panicked", true, result.is_err());

        let locked = mutex.is_locked();
        crate::assert_with_log!(!locked, "released on unwind", false, locked);
        let len = mutex.lock().len();
        crate::assert_with_log!(len == 2, "write before panic kept", 2usize, len);
        crate::test_complete!("panic_in_critical_section_releases_lock");
    }

    #[test]
    fn force_unlock_after_forget() {
        init_test("force_unlock_after_forget");
        let mutex = Mutex::new(5);

        std::mem::forget(mutex.lock());
        let locked = mutex.is_locked();
        crate::assert_with_log!(locked, "forgotten guard keeps lock", true, locked);

        unsafe { mutex.force_unlock() };
        let locked = mutex.is_locked();
        crate::assert_with_log!(!locked, "force_unlock released", false, locked);
        crate::test_complete!("force_unlock_after_forget");
    }

    #[test]
    fn force_unlock_by_non_owner_panics_without_releasing() {
        init_test("force_unlock_by_non_owner_panics_without_releasing");
        let mutex = Arc::new(Mutex::new(5));
        std::mem::forget(mutex.lock());

        let intruder = Arc::clone(&mutex);
        let joined = thread::spawn(move || unsafe { intruder.force_unlock() }).join();
        crate::assert_with_log!(joined.is_err(), "non-owner panicked", true, joined.is_err());

        let still_owned = mutex.is_owned_by_current_thread();
        crate::assert_with_log!(still_owned, "owner unchanged", true, still_owned);
        unsafe { mutex.force_unlock() };
        crate::test_complete!("force_unlock_by_non_owner_panics_without_releasing");
    }

    #[test]
    #[should_panic(expected = "released a lock that is not held")]
    fn force_unlock_unlocked_panics() {
        let mutex = Mutex::new(());
        unsafe { mutex.force_unlock() };
    }

    #[test]
    #[should_panic(expected = "released a lock that is not held")]
    fn guard_dropped_after_force_unlock_panics() {
        let mutex = Mutex::new(());
        let guard = mutex.lock();
        // Breaks the force_unlock contract: the guard is still live.
        unsafe { mutex.force_unlock() };
        drop(guard);
    }

    #[test]
    fn unlocked_lets_other_threads_in() {
        init_test("unlocked_lets_other_threads_in");
        let mutex = Arc::new(Mutex::new(0u32));
        let mut guard = mutex.lock();

        let (tx, rx) = mpsc::channel();
        let other = Arc::clone(&mutex);
        let handle = thread::spawn(move || {
            *other.lock() += 10;
            tx.send(()).expect("send");
        });

        MutexGuard::unlocked(&mut guard, || {
            rx.recv_timeout(Duration::from_secs(10))
                .expect("other thread should get the lock");
        });

        let value = *guard;
        crate::assert_with_log!(value == 10, "saw other thread's write", 10u32, value);
        let owned = mutex.is_owned_by_current_thread();
        crate::assert_with_log!(owned, "re-acquired", true, owned);
        drop(guard);
        handle.join().expect("worker");
        crate::test_complete!("unlocked_lets_other_threads_in");
    }

    #[test]
    fn unlocked_relocks_on_panic() {
        init_test("unlocked_relocks_on_panic");
        let mutex = Mutex::new(1u32);

        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut guard = mutex.lock();
            MutexGuard::unlocked(&mut guard, || panic!("inside unlocked"));
        }));
        crate::assert_with_log!(result.is_err(), "panicked", true, result.is_err());

        let locked = mutex.is_locked();
        crate::assert_with_log!(!locked, "fully released after unwind", false, locked);
        crate::test_complete!("unlocked_relocks_on_panic");
    }

    #[test]
    fn critical_sections_never_overlap() {
        init_test("critical_sections_never_overlap");
        let mutex = Arc::new(Mutex::new(()));
        let inside = Arc::new(AtomicBool::new(false));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mutex = Arc::clone(&mutex);
                let inside = Arc::clone(&inside);
                let overlaps = Arc::clone(&overlaps);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let _guard = mutex.lock();
                        if inside.swap(true, Ordering::SeqCst) {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        std::hint::spin_loop();
                        inside.store(false, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker panicked");
        }

        let overlaps = overlaps.load(Ordering::SeqCst);
        crate::assert_with_log!(overlaps == 0, "no overlapping sections", 0usize, overlaps);
        crate::test_complete!("critical_sections_never_overlap");
    }

    #[test]
    fn waiters_counts_parked_threads() {
        init_test("waiters_counts_parked_threads");
        let mutex = Arc::new(Mutex::new(0));
        let guard = mutex.lock();

        let contender = Arc::clone(&mutex);
        let handle = thread::spawn(move || {
            *contender.lock() += 1;
        });

        let mut parked = false;
        for _ in 0..1000 {
            if mutex.waiters() == 1 {
                parked = true;
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        crate::assert_with_log!(parked, "contender parked", true, parked);

        drop(guard);
        handle.join().expect("contender");
        let waiters = mutex.waiters();
        crate::assert_with_log!(waiters == 0, "waiter left", 0usize, waiters);
        let value = *mutex.lock();
        crate::assert_with_log!(value == 1, "contender ran", 1, value);
        crate::test_complete!("waiters_counts_parked_threads");
    }

    #[test]
    fn test_mutex_get_mut_and_into_inner() {
        init_test("test_mutex_get_mut_and_into_inner");
        let mut mutex = Mutex::new(vec![1, 2]);
        mutex.get_mut().push(3);
        let inner = mutex.into_inner();
        crate::assert_with_log!(inner == vec![1, 2, 3], "inner value", vec![1, 2, 3], inner);
        crate::test_complete!("test_mutex_get_mut_and_into_inner");
    }

    #[test]
    fn test_mutex_default_and_debug() {
        init_test("test_mutex_default_and_debug");
        let mutex: Mutex<u32> = Mutex::default();
        let dbg = format!("{mutex:?}");
        crate::assert_with_log!(dbg.contains("data: 0"), "debug shows data", "data: 0", dbg);

        let _guard = mutex.lock();
        let dbg = format!("{mutex:?}");
        crate::assert_with_log!(dbg.contains("<locked>"), "debug when held", "<locked>", dbg);
        crate::test_complete!("test_mutex_default_and_debug");
    }

    #[test]
    fn try_lock_error_debug_clone_copy_eq_display() {
        let err = TryLockError::Locked;
        let copied = err;
        assert_eq!(err, copied);
        assert_eq!(format!("{err:?}"), "Locked");
        assert_eq!(err.to_string(), "mutex is locked");
        assert_eq!(
            TryLockError::HeldByCurrentThread.to_string(),
            "mutex is already held by this thread"
        );
    }

    #[test]
    fn metrics_snapshot_carries_name() {
        init_test("metrics_snapshot_carries_name");
        let mutex = Mutex::named("tasks", 0);
        let snap = mutex.metrics();
        crate::assert_with_log!(snap.name == "tasks", "snapshot name", "tasks", snap.name);
        crate::test_complete!("metrics_snapshot_carries_name");
    }

    #[cfg(feature = "lock-metrics")]
    #[test]
    fn metrics_count_acquisitions_and_contention() {
        init_test("metrics_count_acquisitions_and_contention");
        let mutex = Arc::new(Mutex::named("counter", 0u64));
        {
            let _a = mutex.lock();
        }
        {
            let _b = mutex.try_lock().expect("uncontended");
        }

        let guard = mutex.lock();
        let contender = Arc::clone(&mutex);
        let handle = thread::spawn(move || {
            *contender.lock() += 1;
        });
        while mutex.waiters() == 0 {
            thread::yield_now();
        }
        drop(guard);
        handle.join().expect("contender");

        let snap = mutex.metrics();
        crate::assert_with_log!(snap.acquisitions == 4, "acquisitions", 4u64, snap.acquisitions);
        crate::assert_with_log!(snap.contentions == 1, "contentions", 1u64, snap.contentions);
        crate::assert_with_log!(snap.max_wait_ns > 0, "waited", "> 0", snap.max_wait_ns);

        mutex.reset_metrics();
        let snap = mutex.metrics();
        crate::assert_with_log!(snap.acquisitions == 0, "reset", 0u64, snap.acquisitions);
        crate::test_complete!("metrics_count_acquisitions_and_contention");
    }
}

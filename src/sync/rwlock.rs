//! Blocking read-write lock with writer preference.
//!
//! Any number of readers may hold the lock together, or a single writer may
//! hold it alone. Once a writer is waiting, new readers queue behind it.
//!
//! # Writer-Preference Fairness
//!
//! | Scenario                  | Behavior                                      |
//! |---------------------------|-----------------------------------------------|
//! | No writers waiting        | Readers acquire immediately                   |
//! | Writer waiting            | New readers blocked until writer completes    |
//! | Existing readers + writer | Writer waits for all readers to release       |
//! | Multiple writers          | Writers are served in arrival order (FIFO)    |
//!
//! Writers cannot starve: a waiting writer blocks new readers, and writers
//! take numbered tickets so none of them is overtaken by a later one. Readers
//! can starve under a continuous stream of writers.
//!
//! # Misuse
//!
//! A thread holding the write side that calls [`RwLock::read`] or
//! [`RwLock::write`] again panics with [`ContractViolation::Relock`]. Readers
//! are not tracked per thread, so a thread that already holds a read guard
//! and calls `read` again while a writer is queued deadlocks; so does a
//! reader calling `write`.
//!
//! # Example
//!
//! ```
//! use lockwork::sync::RwLock;
//!
//! let lock = RwLock::new(vec![1, 2, 3]);
//!
//! // Multiple readers can access concurrently
//! let read1 = lock.read();
//! let read2 = lock.read();
//! assert_eq!(read1.len() + read2.len(), 6);
//!
//! // Writers get exclusive access
//! drop((read1, read2));
//! let mut write = lock.write();
//! write.push(4);
//! ```

#![allow(unsafe_code)]

use parking_lot::{Condvar as ParkingCondvar, Mutex as ParkingMutex};
use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::thread::{self, ThreadId};

use crate::error::ContractViolation;

/// Error returned when trying to read without waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryReadError {
    /// The lock is currently write-locked or a writer is waiting.
    Locked,
}

impl std::fmt::Display for TryReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked => write!(f, "rwlock is write-locked"),
        }
    }
}

impl std::error::Error for TryReadError {}

/// Error returned when trying to write without waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryWriteError {
    /// The lock is currently held by readers or a writer, or writers are queued.
    Locked,
}

impl std::fmt::Display for TryWriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked => write!(f, "rwlock is locked"),
        }
    }
}

impl std::error::Error for TryWriteError {}

/// Point-in-time view of a lock's bookkeeping, for instrumentation and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RwLockState {
    /// Number of active read guards.
    pub readers: usize,
    /// Whether a write guard is active.
    pub writer_active: bool,
    /// Number of writers parked in [`RwLock::write`].
    pub writer_waiters: usize,
}

#[derive(Debug, Default)]
struct State {
    readers: usize,
    writer_active: bool,
    writer_owner: Option<ThreadId>,
    writer_waiters: usize,
    /// Next ticket handed to an arriving writer.
    next_ticket: u64,
    /// Ticket of the writer allowed to acquire next.
    serving: u64,
}

impl State {
    fn held_for_write_by(&self, me: ThreadId) -> bool {
        self.writer_active && self.writer_owner == Some(me)
    }

    fn take_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        ticket
    }

    fn become_writer(&mut self, me: ThreadId) {
        self.serving = self.serving.wrapping_add(1);
        self.writer_active = true;
        self.writer_owner = Some(me);
    }
}

/// A blocking read-write lock with writer-preference fairness.
pub struct RwLock<T> {
    state: ParkingMutex<State>,
    readers_cv: ParkingCondvar,
    writers_cv: ParkingCondvar,
    data: UnsafeCell<T>,
}

// Safety: readers share `&T` across threads, writers get `&mut T`; both are
// serialized by `state`.
unsafe impl<T: Send> Send for RwLock<T> {}
unsafe impl<T: Send + Sync> Sync for RwLock<T> {}

impl<T> RwLock<T> {
    /// Creates a new lock containing the given value.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            state: ParkingMutex::new(State::default()),
            readers_cv: ParkingCondvar::new(),
            writers_cv: ParkingCondvar::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Consumes the lock and returns the inner value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Returns a mutable reference to the inner value.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Returns a snapshot of readers, writer and queued writers.
    #[must_use]
    pub fn state(&self) -> RwLockState {
        let state = self.state.lock();
        RwLockState {
            readers: state.readers,
            writer_active: state.writer_active,
            writer_waiters: state.writer_waiters,
        }
    }

    /// Acquires shared access, parking while a writer is active or queued.
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::Relock`] if the calling thread holds
    /// the write side.
    #[track_caller]
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.held_for_write_by(me) {
            drop(state);
            ContractViolation::Relock.raise();
        }
        while state.writer_active || state.writer_waiters > 0 {
            self.readers_cv.wait(&mut state);
        }
        state.readers += 1;
        drop(state);
        RwLockReadGuard::new(self)
    }

    /// Tries to acquire shared access without waiting.
    pub fn try_read(&self) -> Result<RwLockReadGuard<'_, T>, TryReadError> {
        let mut state = self.state.lock();
        if state.writer_active || state.writer_waiters > 0 {
            return Err(TryReadError::Locked);
        }
        state.readers += 1;
        drop(state);
        Ok(RwLockReadGuard::new(self))
    }

    /// Acquires exclusive access.
    ///
    /// The writer takes a ticket on arrival and waits until every reader has
    /// left, no writer is active, and every earlier ticket has been served.
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::Relock`] if the calling thread already
    /// holds the write side.
    #[track_caller]
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.held_for_write_by(me) {
            drop(state);
            ContractViolation::Relock.raise();
        }

        let ticket = state.take_ticket();
        state.writer_waiters += 1;
        while state.writer_active || state.readers > 0 || state.serving != ticket {
            self.writers_cv.wait(&mut state);
        }
        state.writer_waiters -= 1;
        state.become_writer(me);
        drop(state);
        RwLockWriteGuard::new(self)
    }

    /// Tries to acquire exclusive access without waiting.
    ///
    /// Fails while any guard is held or any writer is queued, so it never
    /// jumps ahead of a waiting writer.
    pub fn try_write(&self) -> Result<RwLockWriteGuard<'_, T>, TryWriteError> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.writer_active || state.readers > 0 || state.writer_waiters > 0 {
            return Err(TryWriteError::Locked);
        }
        // No writer is queued, so this ticket is the one being served.
        let ticket = state.take_ticket();
        debug_assert_eq!(ticket, state.serving);
        state.become_writer(me);
        drop(state);
        Ok(RwLockWriteGuard::new(self))
    }

    #[track_caller]
    fn release_shared(&self) {
        let mut state = self.state.lock();
        if state.readers == 0 {
            drop(state);
            ContractViolation::ReleaseUnheld.raise();
        }
        state.readers -= 1;
        let wake_writers = state.readers == 0 && state.writer_waiters > 0;
        drop(state);
        if wake_writers {
            self.writers_cv.notify_all();
        }
    }

    #[track_caller]
    fn release_exclusive(&self) {
        let mut state = self.state.lock();
        if !state.writer_active {
            drop(state);
            ContractViolation::ReleaseUnheld.raise();
        }
        state.writer_active = false;
        state.writer_owner = None;
        let writers_waiting = state.writer_waiters > 0;
        drop(state);
        // Queued writers keep readers out, so only wake readers when none remain.
        if writers_waiting {
            self.writers_cv.notify_all();
        } else {
            self.readers_cv.notify_all();
        }
    }
}

impl<T: Default> Default for RwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for RwLock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut d = f.debug_struct("RwLock");
        match self.try_read() {
            Ok(guard) => d.field("data", &&*guard),
            Err(_) => d.field("data", &format_args!("<locked>")),
        };
        d.finish_non_exhaustive()
    }
}

/// Guard for a shared read lock.
#[must_use = "guard will be immediately released if not held"]
pub struct RwLockReadGuard<'a, T> {
    lock: &'a RwLock<T>,
    _not_send: PhantomData<*const ()>,
}

unsafe impl<T: Sync> Sync for RwLockReadGuard<'_, T> {}

impl<'a, T> RwLockReadGuard<'a, T> {
    fn new(lock: &'a RwLock<T>) -> Self {
        Self {
            lock,
            _not_send: PhantomData,
        }
    }
}

impl<T> Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for RwLockReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_shared();
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for RwLockReadGuard<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RwLockReadGuard").field("data", &**self).finish()
    }
}

/// Guard for an exclusive write lock.
#[must_use = "guard will be immediately released if not held"]
pub struct RwLockWriteGuard<'a, T> {
    lock: &'a RwLock<T>,
    _not_send: PhantomData<*const ()>,
}

unsafe impl<T: Sync> Sync for RwLockWriteGuard<'_, T> {}

impl<'a, T> RwLockWriteGuard<'a, T> {
    fn new(lock: &'a RwLock<T>) -> Self {
        Self {
            lock,
            _not_send: PhantomData,
        }
    }

    /// Turns exclusive access into shared access without releasing the lock.
    ///
    /// No writer can slip in between. Readers waiting for this writer are
    /// admitted unless another writer is already queued.
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::ReleaseUnheld`] if the write side is
    /// no longer held.
    #[track_caller]
    pub fn downgrade(guard: Self) -> RwLockReadGuard<'a, T> {
        let guard = ManuallyDrop::new(guard);
        let lock = guard.lock;
        let wake_readers = {
            let mut state = lock.state.lock();
            if !state.writer_active {
                drop(state);
                ContractViolation::ReleaseUnheld.raise();
            }
            state.writer_active = false;
            state.writer_owner = None;
            state.readers += 1;
            state.writer_waiters == 0
        };
        if wake_readers {
            lock.readers_cv.notify_all();
        }
        RwLockReadGuard::new(lock)
    }
}

impl<T> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for RwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for RwLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_exclusive();
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for RwLockWriteGuard<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RwLockWriteGuard")
            .field("data", &**self)
            .finish()
    }
}

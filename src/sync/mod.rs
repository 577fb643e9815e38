//! Blocking synchronization primitives.
//!
//! # Primitives
//!
//! - [`Mutex`]: mutual exclusion with RAII guards and owner tracking
//! - [`Condvar`]: wait/notify paired with a held [`Mutex`]
//! - [`RwLock`]: many readers or one writer, writers preferred
//! - [`multi`]: acquire several [`Lockable`] resources without deadlock
//!
//! # Blocking model
//!
//! Every blocking call parks only the calling OS thread on an internal
//! `parking_lot` condition variable. There is no lock-free fast path and no
//! cancellation. The `try_*` operations are the only ones guaranteed not to
//! block; [`Condvar::wait_timeout_until`] is the only one with a deadline.
//!
//! # Misuse
//!
//! Caller bugs that would otherwise deadlock or corrupt state are detected
//! and raised as a [`ContractViolation`](crate::ContractViolation) panic:
//!
//! | Misuse                                  | Violation              |
//! |-----------------------------------------|------------------------|
//! | `lock` on a mutex the thread holds      | `Relock`               |
//! | `force_unlock` by a non-owner           | `UnlockNotOwner`       |
//! | `read`/`write` while holding the write side | `Relock`           |
//! | condvar used with a second mutex while threads are parked | `CondvarMutexMismatch` |
//! | same resource twice in a multi-lock     | `DuplicateResource`    |

mod backoff;
mod condvar;
mod lockable;
mod metrics;
pub mod multi;
mod mutex;
mod rwlock;

pub use backoff::Backoff;
pub use condvar::{Condvar, WaitTimeoutResult};
pub use lockable::Lockable;
pub use metrics::LockMetricsSnapshot;
pub use multi::{LockSet, MultiLock, MultiLockGuard, lock_all, lock_set, try_lock_all};
pub use mutex::{Mutex, MutexGuard, TryLockError};
pub use rwlock::{RwLock, RwLockReadGuard, RwLockState, RwLockWriteGuard, TryReadError, TryWriteError};

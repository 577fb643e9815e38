//! Lockwork: blocking synchronization primitives for OS threads.
//!
//! The crate provides a small set of coordination tools:
//!
//! - [`sync::Mutex`]: exclusive lock with scoped guards
//! - [`sync::Condvar`]: predicate-based wait/notify paired with a held mutex
//! - [`sync::RwLock`]: writer-preferring shared/exclusive lock
//! - [`sync::multi`]: deadlock-avoiding acquisition of several locks at once
//!
//! Every blocking call parks only the calling thread. Guards release on every
//! exit path, including panic unwinding. Caller bugs such as re-locking a held
//! mutex are detected and reported as a [`ContractViolation`] panic instead of
//! silently deadlocking or corrupting internal state.
//!
//! # Example
//!
//! ```
//! use lockwork::sync::{Condvar, Mutex};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let pair = Arc::new((Mutex::new(0u32), Condvar::new()));
//!
//! let workers: Vec<_> = (0..2)
//!     .map(|_| {
//!         let pair = Arc::clone(&pair);
//!         thread::spawn(move || {
//!             let (count, ready) = &*pair;
//!             let mut guard = count.lock();
//!             *guard += 1;
//!             if *guard == 2 {
//!                 ready.notify_one(&guard);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! let (count, ready) = &*pair;
//! let mut guard = count.lock();
//! ready.wait_until(&mut guard, |count| *count == 2);
//! assert_eq!(*guard, 2);
//! drop(guard);
//!
//! for worker in workers {
//!     worker.join().unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod sync;

mod tracing_compat;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{BackoffConfig, ConfigError};
pub use error::ContractViolation;

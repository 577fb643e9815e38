//! Error types for lockwork.
//!
//! Two kinds of failure exist at this layer:
//!
//! - **Contract violations**: caller bugs such as re-locking a mutex the
//!   thread already holds, or pairing one condition variable with two
//!   mutexes. These are never returned as values. They are logged and then
//!   raised as a panic carrying a [`ContractViolation`] message, before any
//!   internal state is touched.
//! - **Non-blocking failures**: `try_*` operations report unavailability
//!   through their own `Result` error enums (see [`crate::sync`]). They never
//!   panic.
//!
//! There are no transient or I/O errors; everything here is in-memory
//! coordination.

use crate::tracing_compat::error;

/// A misuse of a synchronization primitive by its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ContractViolation {
    /// A non-reentrant lock was acquired again by the thread holding it.
    #[error("lock re-acquired by the thread that already holds it")]
    Relock,
    /// A lock was released by a thread that does not hold it.
    #[error("lock released by a thread that does not hold it")]
    UnlockNotOwner,
    /// A lock side was released while nothing held it.
    #[error("released a lock that is not held")]
    ReleaseUnheld,
    /// A condition variable was used with a mutex other than the one its
    /// parked waiters use.
    #[error("condition variable used with more than one mutex")]
    CondvarMutexMismatch,
    /// The same resource appeared twice in one multi-lock request.
    #[error("the same resource appears twice in a multi-lock request")]
    DuplicateResource,
}

impl ContractViolation {
    /// Logs the violation and panics with its message.
    #[cold]
    #[track_caller]
    pub(crate) fn raise(self) -> ! {
        error!(violation = %self, "synchronization contract violated");
        panic!("contract violation: {self}");
    }
}

//! The capability shared by every resource a multi-lock can acquire.

use super::mutex::{Mutex, MutexGuard};
use super::rwlock::{RwLock, RwLockWriteGuard};

/// A resource with a blocking acquire and a non-blocking try-acquire.
///
/// The guard releases the resource when dropped. [`RwLock`] participates
/// through its exclusive side.
pub trait Lockable {
    /// Guard proving the resource is held.
    type Guard<'a>
    where
        Self: 'a;

    /// Blocks until the resource is held.
    fn lock(&self) -> Self::Guard<'_>;

    /// Acquires the resource only if that needs no waiting.
    fn try_lock(&self) -> Option<Self::Guard<'_>>;
}

impl<T> Lockable for Mutex<T> {
    type Guard<'a>
        = MutexGuard<'a, T>
    where
        T: 'a;

    #[track_caller]
    fn lock(&self) -> MutexGuard<'_, T> {
        Mutex::lock(self)
    }

    fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        Mutex::try_lock(self).ok()
    }
}

impl<T> Lockable for RwLock<T> {
    type Guard<'a>
        = RwLockWriteGuard<'a, T>
    where
        T: 'a;

    #[track_caller]
    fn lock(&self) -> RwLockWriteGuard<'_, T> {
        self.write()
    }

    fn try_lock(&self) -> Option<RwLockWriteGuard<'_, T>> {
        self.try_write().ok()
    }
}

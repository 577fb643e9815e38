//! Deadlock-free acquisition of several locks at once.
//!
//! Locking resources one by one in a caller-chosen order deadlocks as soon as
//! two threads pick different orders. A multi-lock request instead runs in
//! rounds:
//!
//! 1. Block on one resource (the first one initially).
//! 2. Try every other resource without blocking, in rotated order.
//! 3. If one is busy, release everything taken this round in reverse order,
//!    back off, and start the next round by blocking on the busy resource.
//!
//! A thread never waits while holding anything, so no cycle of waits can
//! form. The request either returns with every resource held or keeps
//! retrying; it never returns with a subset.
//!
//! # Example
//!
//! ```
//! use lockwork::sync::{Mutex, multi};
//!
//! let from = Mutex::new(100);
//! let to = Mutex::new(0);
//!
//! let mut guards = multi::lock_all(&[&from, &to]);
//! *guards[0] -= 30;
//! *guards[1] += 30;
//! drop(guards);
//!
//! let (a, b) = multi::lock_set((&from, &to));
//! assert_eq!(*a + *b, 100);
//! ```

use smallvec::SmallVec;
use std::ops::{Deref, DerefMut};
use std::ptr;

use super::backoff::Backoff;
use super::lockable::Lockable;
use crate::config::{BackoffConfig, ConfigError};
use crate::error::ContractViolation;
use crate::tracing_compat::{debug, trace};

/// Failed rounds after which a request logs that it is still contended.
const CONTENTION_LOG_THRESHOLD: u32 = 64;

/// Index-addressed access to the resources of one request, used by the
/// round loop so slices and tuples share it.
trait Acquisition {
    fn len(&self) -> usize;
    fn lock(&mut self, index: usize);
    fn try_lock(&mut self, index: usize) -> bool;
    fn release(&mut self, index: usize);
}

/// Panics if any address appears twice.
#[track_caller]
fn ensure_distinct(addresses: &[usize]) {
    for (i, a) in addresses.iter().enumerate() {
        if addresses[i + 1..].contains(a) {
            ContractViolation::DuplicateResource.raise();
        }
    }
}

fn address_of<T: ?Sized>(resource: &T) -> usize {
    ptr::from_ref(resource).cast::<()>() as usize
}

/// Entry point for multi-resource requests with configurable pacing.
///
/// The free functions [`lock_all`], [`try_lock_all`] and [`lock_set`] use
/// [`MultiLock::default`].
#[derive(Debug, Clone, Default)]
pub struct MultiLock {
    config: BackoffConfig,
}

impl MultiLock {
    /// Creates a multi-lock with the default backoff schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a multi-lock with a custom backoff schedule.
    pub fn with_config(config: BackoffConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the backoff schedule used between rounds.
    #[must_use]
    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Acquires every resource in `resources`, blocking until all are held.
    ///
    /// The returned guard derefs to the per-resource guards in the order
    /// given. An empty slice returns an empty guard at once.
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::DuplicateResource`] if the same
    /// resource appears twice.
    #[track_caller]
    pub fn lock_all<'a, L: Lockable>(&self, resources: &[&'a L]) -> MultiLockGuard<'a, L> {
        let mut slots = SliceSlots::new(resources);
        let attempts = self.acquire(&mut slots);
        slots.into_guard(attempts)
    }

    /// Makes a single non-blocking pass over `resources`.
    ///
    /// Returns `None`, holding nothing, if any resource is busy.
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::DuplicateResource`] if the same
    /// resource appears twice.
    #[track_caller]
    pub fn try_lock_all<'a, L: Lockable>(
        &self,
        resources: &[&'a L],
    ) -> Option<MultiLockGuard<'a, L>> {
        let mut slots = SliceSlots::new(resources);
        let attempts = u32::from(!resources.is_empty());
        try_once(&mut slots).then(|| slots.into_guard(attempts))
    }

    /// Acquires a tuple of up to four resources of different types.
    ///
    /// Returns the guards as a tuple in the same order.
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::DuplicateResource`] if the same
    /// resource appears twice.
    #[track_caller]
    pub fn lock_set<'a, S: LockSet<'a>>(&self, set: S) -> S::Guards {
        let mut slots = TupleSlots::new(set);
        self.acquire(&mut slots);
        slots.into_guards()
    }

    /// Runs rounds until every resource is held. Returns the round count.
    fn acquire<A: Acquisition>(&self, slots: &mut A) -> u32 {
        let len = slots.len();
        if len == 0 {
            return 0;
        }

        let mut backoff = Backoff::for_current_thread(self.config.clone());
        let mut first = 0;
        let mut attempts = 0u32;
        loop {
            attempts = attempts.saturating_add(1);
            slots.lock(first);
            let Some(contended) = try_rest(slots, first) else {
                return attempts;
            };

            trace!(
                attempt = attempts,
                contended,
                resources = len,
                "multi-lock round failed; released held resources"
            );
            if attempts == CONTENTION_LOG_THRESHOLD {
                debug!(
                    attempts,
                    contended,
                    resources = len,
                    "multi-lock request still contended"
                );
            }

            first = contended;
            backoff.snooze();
        }
    }
}

/// Tries every resource after `first` in rotated order.
///
/// On failure releases what this round took, newest first, and returns the
/// index that was busy.
fn try_rest<A: Acquisition>(slots: &mut A, first: usize) -> Option<usize> {
    let len = slots.len();
    for offset in 1..len {
        let index = (first + offset) % len;
        if !slots.try_lock(index) {
            for taken in (0..offset).rev() {
                slots.release((first + taken) % len);
            }
            return Some(index);
        }
    }
    None
}

fn try_once<A: Acquisition>(slots: &mut A) -> bool {
    if slots.len() == 0 {
        return true;
    }
    slots.try_lock(0) && try_rest(slots, 0).is_none()
}

struct SliceSlots<'r, 'a, L: Lockable + 'a> {
    resources: &'r [&'a L],
    held: SmallVec<[Option<L::Guard<'a>>; 4]>,
}

impl<'r, 'a, L: Lockable + 'a> SliceSlots<'r, 'a, L> {
    #[track_caller]
    fn new(resources: &'r [&'a L]) -> Self {
        let addresses: SmallVec<[usize; 4]> = resources.iter().map(|r| address_of(*r)).collect();
        ensure_distinct(&addresses);
        Self {
            resources,
            held: resources.iter().map(|_| None).collect(),
        }
    }

    fn into_guard(self, attempts: u32) -> MultiLockGuard<'a, L> {
        let guards: SmallVec<[L::Guard<'a>; 4]> = self.held.into_iter().flatten().collect();
        debug_assert_eq!(guards.len(), self.resources.len());
        MultiLockGuard { guards, attempts }
    }
}

impl<'a, L: Lockable + 'a> Acquisition for SliceSlots<'_, 'a, L> {
    fn len(&self) -> usize {
        self.resources.len()
    }

    fn lock(&mut self, index: usize) {
        self.held[index] = Some(Lockable::lock(self.resources[index]));
    }

    fn try_lock(&mut self, index: usize) -> bool {
        match Lockable::try_lock(self.resources[index]) {
            Some(guard) => {
                self.held[index] = Some(guard);
                true
            }
            None => false,
        }
    }

    fn release(&mut self, index: usize) {
        drop(self.held[index].take());
    }
}

/// All guards of a [`MultiLock::lock_all`] request.
///
/// Derefs to the per-resource guards, in request order. Dropping it releases
/// them in reverse order.
#[must_use = "guards will be immediately released if not held"]
pub struct MultiLockGuard<'a, L: Lockable + 'a> {
    guards: SmallVec<[L::Guard<'a>; 4]>,
    attempts: u32,
}

impl<'a, L: Lockable + 'a> MultiLockGuard<'a, L> {
    /// Number of rounds the request needed. Zero for an empty request.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl<'a, L: Lockable + 'a> Deref for MultiLockGuard<'a, L> {
    type Target = [L::Guard<'a>];

    fn deref(&self) -> &Self::Target {
        &self.guards
    }
}

impl<'a, L: Lockable + 'a> DerefMut for MultiLockGuard<'a, L> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guards
    }
}

impl<'a, L: Lockable + 'a> Drop for MultiLockGuard<'a, L> {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

impl<'a, L: Lockable + 'a> std::fmt::Debug for MultiLockGuard<'a, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiLockGuard")
            .field("resources", &self.guards.len())
            .field("attempts", &self.attempts)
            .finish()
    }
}

mod private {
    pub trait Sealed {}
}

/// A tuple of references to [`Lockable`] resources, accepted by
/// [`MultiLock::lock_set`].
///
/// Implemented for tuples of one to four references. The guards come back as
/// a tuple and release in field order when dropped together.
pub trait LockSet<'a>: private::Sealed {
    /// Tuple of guards, one per resource.
    type Guards;

    #[doc(hidden)]
    type Slots;

    #[doc(hidden)]
    fn empty_slots() -> Self::Slots;

    #[doc(hidden)]
    fn addresses(&self) -> SmallVec<[usize; 4]>;

    #[doc(hidden)]
    fn lock_slot(&self, slots: &mut Self::Slots, index: usize);

    #[doc(hidden)]
    fn try_lock_slot(&self, slots: &mut Self::Slots, index: usize) -> bool;

    #[doc(hidden)]
    fn release_slot(slots: &mut Self::Slots, index: usize);

    #[doc(hidden)]
    fn into_guards(slots: Self::Slots) -> Option<Self::Guards>;
}

macro_rules! impl_lock_set {
    ($($name:ident : $idx:tt),+) => {
        impl<'a, $($name: Lockable + 'a),+> private::Sealed for ($(&'a $name,)+) {}

        impl<'a, $($name: Lockable + 'a),+> LockSet<'a> for ($(&'a $name,)+) {
            type Guards = ($(<$name as Lockable>::Guard<'a>,)+);
            type Slots = ($(Option<<$name as Lockable>::Guard<'a>>,)+);

            fn empty_slots() -> Self::Slots {
                ($(None::<<$name as Lockable>::Guard<'a>>,)+)
            }

            fn addresses(&self) -> SmallVec<[usize; 4]> {
                smallvec::smallvec![$(address_of(self.$idx)),+]
            }

            fn lock_slot(&self, slots: &mut Self::Slots, index: usize) {
                match index {
                    $($idx => slots.$idx = Some(Lockable::lock(self.$idx)),)+
                    _ => unreachable!("lock set index {index} out of range"),
                }
            }

            fn try_lock_slot(&self, slots: &mut Self::Slots, index: usize) -> bool {
                match index {
                    $($idx => {
                        slots.$idx = Lockable::try_lock(self.$idx);
                        slots.$idx.is_some()
                    })+
                    _ => unreachable!("lock set index {index} out of range"),
                }
            }

            fn release_slot(slots: &mut Self::Slots, index: usize) {
                match index {
                    $($idx => drop(slots.$idx.take()),)+
                    _ => unreachable!("lock set index {index} out of range"),
                }
            }

            fn into_guards(slots: Self::Slots) -> Option<Self::Guards> {
                Some(($(slots.$idx?,)+))
            }
        }
    };
}

impl_lock_set!(A: 0);
impl_lock_set!(A: 0, B: 1);
impl_lock_set!(A: 0, B: 1, C: 2);
impl_lock_set!(A: 0, B: 1, C: 2, D: 3);

struct TupleSlots<'a, S: LockSet<'a>> {
    set: S,
    len: usize,
    held: S::Slots,
}

impl<'a, S: LockSet<'a>> TupleSlots<'a, S> {
    #[track_caller]
    fn new(set: S) -> Self {
        let addresses = set.addresses();
        ensure_distinct(&addresses);
        Self {
            set,
            len: addresses.len(),
            held: S::empty_slots(),
        }
    }

    fn into_guards(self) -> S::Guards {
        match S::into_guards(self.held) {
            Some(guards) => guards,
            None => unreachable!("lock set returned with a resource not held"),
        }
    }
}

impl<'a, S: LockSet<'a>> Acquisition for TupleSlots<'a, S> {
    fn len(&self) -> usize {
        self.len
    }

    fn lock(&mut self, index: usize) {
        self.set.lock_slot(&mut self.held, index);
    }

    fn try_lock(&mut self, index: usize) -> bool {
        self.set.try_lock_slot(&mut self.held, index)
    }

    fn release(&mut self, index: usize) {
        S::release_slot(&mut self.held, index);
    }
}

/// Acquires every resource with the default backoff schedule.
///
/// See [`MultiLock::lock_all`].
#[track_caller]
pub fn lock_all<'a, L: Lockable>(resources: &[&'a L]) -> MultiLockGuard<'a, L> {
    MultiLock::new().lock_all(resources)
}

/// One non-blocking pass over every resource.
///
/// See [`MultiLock::try_lock_all`].
#[track_caller]
pub fn try_lock_all<'a, L: Lockable>(resources: &[&'a L]) -> Option<MultiLockGuard<'a, L>> {
    MultiLock::new().try_lock_all(resources)
}

/// Acquires a tuple of resources with the default backoff schedule.
///
/// See [`MultiLock::lock_set`].
#[track_caller]
pub fn lock_set<'a, S: LockSet<'a>>(set: S) -> S::Guards {
    MultiLock::new().lock_set(set)
}

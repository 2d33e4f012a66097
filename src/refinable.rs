use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned};
use crossbeam_utils::Backoff;

use crate::markable::MarkableCell;
use crate::table;
use crate::ConcurrentSet;

/// A concurrent hash set with one lock per bucket.
///
/// Unrelated buckets can be mutated by different threads concurrently.
/// When the load factor exceeds 4, the thread that noticed performs an
/// exclusive resize that replaces the bucket array, and its locks, out from
/// under in-flight operations: it claims a process-wide resize flag, waits
/// for every current lock holder to finish (quiescence), rehashes into a
/// table of twice the size, and publishes it. Threads that raced with the
/// swap detect it after locking and retry against the new table.
///
/// Replaced tables are reclaimed through [`crossbeam_epoch`], so a reader
/// that still holds a reference to a retired table never observes freed
/// memory.
///
/// The element count is kept in an atomic counter independent of the bucket
/// locks, so [`len`](RefinableSet::len) may be stale relative to in-flight
/// operations; it is exact at any quiescent point.
///
/// # Examples
///
/// ```
/// use stripeset::{ConcurrentSet, RefinableSet};
///
/// let set = RefinableSet::with_capacity(16);
/// assert!(set.insert(42));
/// assert!(!set.insert(42));
/// assert!(set.remove(&42));
/// ```
pub struct RefinableSet<T, S = RandomState> {
    state: Atomic<State<T>>,
    // Resize role: the value is the owning thread's token (0 when unowned),
    // the mark is the resize-in-progress flag.
    owner: MarkableCell,
    size: AtomicUsize,
    build_hasher: S,
}

// One table generation. Each bucket's lock owns its chain, so the lock
// array and the bucket array are always the same length and are replaced
// as a unit.
struct State<T> {
    buckets: Box<[Mutex<Vec<T>>]>,
}

impl<T> State<T> {
    fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "initial capacity must be positive");
        Self {
            buckets: (0..capacity).map(|_| Mutex::new(Vec::new())).collect(),
        }
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn bucket(&self, hash: u64) -> &Mutex<Vec<T>> {
        &self.buckets[(hash % self.buckets.len() as u64) as usize]
    }
}

/// Returns this thread's non-zero token for the resize ownership cell.
fn thread_token() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static TOKEN: u64 = NEXT.fetch_add(1, Ordering::Relaxed);
    }
    TOKEN.with(|token| *token)
}

impl<T> RefinableSet<T> {
    /// Creates an empty set with `capacity` buckets.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<T, S> RefinableSet<T, S> {
    /// Creates an empty set with `capacity` buckets, hashing elements with
    /// the given hash builder.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity_and_hasher(capacity: usize, build_hasher: S) -> Self {
        Self {
            state: Atomic::new(State::new(capacity)),
            owner: MarkableCell::new(0, false),
            size: AtomicUsize::new(0),
            build_hasher,
        }
    }

    /// Returns the number of elements in the set.
    ///
    /// The count is read without any lock: under concurrent mutation it may
    /// lag in-flight operations, but it is exact at any quiescent point.
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current number of buckets. Grows by doubling whenever the
    /// load factor exceeds 4; never shrinks.
    pub fn capacity(&self) -> usize {
        let guard = &epoch::pin();
        // Safety: read under `guard`; retired states outlive all pins.
        unsafe { self.state.load(Ordering::Acquire, guard).deref() }.capacity()
    }
}

impl<T, S> RefinableSet<T, S>
where
    T: Hash + Eq + Send + 'static,
    S: BuildHasher,
{
    /// Adds a value to the set. Returns whether the value was newly
    /// inserted.
    pub fn insert(&self, value: T) -> bool {
        let guard = &epoch::pin();
        let hash = self.build_hasher.hash_one(&value);

        {
            let mut chain = self.acquire(hash, guard);
            if chain.contains(&value) {
                return false;
            }
            chain.push(value);
            self.size.fetch_add(1, Ordering::Relaxed);
        }

        // The load-factor check runs after the bucket lock is released. A
        // stale decision is caught by the capacity re-check inside `resize`.
        let capacity =
            unsafe { self.state.load(Ordering::Acquire, guard).deref() }.capacity();
        if table::over_load_factor(self.size.load(Ordering::Relaxed), capacity) {
            self.resize(capacity, guard);
        }
        true
    }

    /// Removes a value from the set. Returns whether the value was present.
    pub fn remove(&self, value: &T) -> bool {
        let guard = &epoch::pin();
        let hash = self.build_hasher.hash_one(value);

        let mut chain = self.acquire(hash, guard);
        match chain.iter().position(|x| x == value) {
            Some(i) => {
                // chain order is irrelevant
                chain.swap_remove(i);
                self.size.fetch_sub(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if the set contains the value.
    pub fn contains(&self, value: &T) -> bool {
        let guard = epoch::pin();
        let hash = self.build_hasher.hash_one(value);
        let chain = self.acquire(hash, &guard);
        chain.contains(value)
    }

    /// Locks the bucket for `hash` in the current table generation.
    ///
    /// The returned guard is valid and stable: the bucket it protects
    /// belongs to the table that is current at return, and no resize
    /// can replace that table until the guard is dropped.
    fn acquire<'g>(&self, hash: u64, guard: &'g Guard) -> MutexGuard<'g, Vec<T>> {
        let me = thread_token();
        loop {
            // Wait out a resize in flight on another thread. No lock is
            // held while spinning, so the resizer is never blocked by us.
            let backoff = Backoff::new();
            loop {
                let (owner, marked) = self.owner.get();
                if !marked || owner == me {
                    break;
                }
                backoff.snooze();
            }

            let state = self.state.load(Ordering::Acquire, guard);
            // Safety: read under `guard`; retired states outlive all pins.
            let chain = unsafe { state.deref() }.bucket(hash).lock().unwrap();

            // A resize may have begun, or completed, between the ownership
            // check and the lock acquisition, in which case this lock
            // belongs to a stale generation. Detect it and start over.
            let (owner, marked) = self.owner.get();
            if (marked && owner != me) || self.state.load(Ordering::Acquire, guard) != state {
                drop(chain);
                continue;
            }

            return chain;
        }
    }

    /// Replaces the table with one of twice the capacity, if this thread
    /// wins the resize role and `old_capacity` is still current. Resizing
    /// is opportunistic: losing the role is not an error, since some thread
    /// is already doing the work.
    fn resize(&self, old_capacity: usize, guard: &Guard) {
        let me = thread_token();

        if !self.owner.compare_and_set(0, me, false, true) {
            return;
        }

        let old = self.state.load(Ordering::Acquire, guard);
        // Safety: read under `guard`, and only the owner retires states.
        let old_ref = unsafe { old.deref() };

        // another thread resized between the policy decision and the CAS
        if old_ref.capacity() != old_capacity {
            self.owner.set(0, false);
            return;
        }

        // Quiesce: take and release every bucket lock in turn. This is a
        // pure barrier. Once the pass completes, every thread that locked a
        // bucket before the mark went up has finished its critical section,
        // and every later acquirer re-validates against the mark and backs
        // off.
        for bucket in old_ref.buckets.iter() {
            drop(bucket.lock().unwrap());
        }

        let new_capacity = old_capacity * 2;
        let mut new = State::new(new_capacity);
        for bucket in old_ref.buckets.iter() {
            // Locked because a stale acquirer may briefly hold this mutex
            // before its re-validation fails; it never mutates the chain.
            for value in bucket.lock().unwrap().drain(..) {
                let i = (self.build_hasher.hash_one(&value) % new_capacity as u64) as usize;
                new.buckets[i].get_mut().unwrap().push(value);
            }
        }

        self.state.store(Owned::new(new), Ordering::Release);
        // Safety: `old` is unlinked, and any thread still holding it is
        // pinned; reclamation is deferred past every active pin.
        unsafe { guard.defer_destroy(old) };

        // reopen the set: waiters in `acquire` proceed against the new table
        self.owner.set(0, false);
    }
}

impl<T, S> ConcurrentSet<T> for RefinableSet<T, S>
where
    T: Hash + Eq + Send + 'static,
    S: BuildHasher,
{
    fn insert(&self, value: T) -> bool {
        RefinableSet::insert(self, value)
    }

    fn remove(&self, value: &T) -> bool {
        RefinableSet::remove(self, value)
    }

    fn contains(&self, value: &T) -> bool {
        RefinableSet::contains(self, value)
    }

    fn len(&self) -> usize {
        RefinableSet::len(self)
    }
}

impl<T, S: Default> Default for RefinableSet<T, S> {
    fn default() -> Self {
        Self::with_capacity_and_hasher(1, S::default())
    }
}

impl<T, S> fmt::Debug for RefinableSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefinableSet")
            .field("len", &self.len())
            .finish()
    }
}

impl<T, S> Drop for RefinableSet<T, S> {
    fn drop(&mut self) {
        // Safety: `&mut self` means no other thread can observe the set,
        // and the current state has never been retired.
        unsafe {
            drop(
                self.state
                    .load(Ordering::Relaxed, epoch::unprotected())
                    .into_owned(),
            );
        }
    }
}

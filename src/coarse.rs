use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::table::{self, Table};
use crate::ConcurrentSet;

/// A concurrent hash set guarded by a single global mutex.
///
/// Every operation takes the one lock, so operations on unrelated buckets
/// serialize; see [`RefinableSet`](crate::RefinableSet) for the striped
/// alternative. The element count is kept in an atomic counter read outside
/// the lock, so [`len`](CoarseSet::len) may be stale relative to an
/// in-flight insert or remove.
///
/// # Examples
///
/// ```
/// use stripeset::{ConcurrentSet, CoarseSet};
///
/// let set = CoarseSet::with_capacity(16);
/// assert!(set.insert(42));
/// assert!(set.contains(&42));
/// ```
pub struct CoarseSet<T, S = RandomState> {
    table: Mutex<Table<T>>,
    // cached copy of the table's bucket count, so the load-factor check
    // after an insert runs without retaking the lock
    capacity: AtomicUsize,
    size: AtomicUsize,
    build_hasher: S,
}

impl<T> CoarseSet<T> {
    /// Creates an empty set with `capacity` buckets.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<T, S> CoarseSet<T, S> {
    /// Creates an empty set with `capacity` buckets, hashing elements with
    /// the given hash builder.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity_and_hasher(capacity: usize, build_hasher: S) -> Self {
        Self {
            table: Mutex::new(Table::new(capacity)),
            capacity: AtomicUsize::new(capacity),
            size: AtomicUsize::new(0),
            build_hasher,
        }
    }

    /// Returns the number of elements in the set.
    ///
    /// The count is read without the lock: under concurrent mutation it may
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
        self.capacity.load(Ordering::Relaxed)
    }
}

impl<T, S> CoarseSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Adds a value to the set. Returns whether the value was newly
    /// inserted.
    pub fn insert(&self, value: T) -> bool {
        let hash = self.build_hasher.hash_one(&value);

        {
            let mut table = self.table.lock().unwrap();
            if !table.insert(hash, value) {
                return false;
            }
            self.size.fetch_add(1, Ordering::Relaxed);
        }

        // The load-factor check runs after the lock is released: the common
        // case pays nothing, and a stale decision is caught by the capacity
        // re-check inside `resize`.
        let capacity = self.capacity.load(Ordering::Relaxed);
        if table::over_load_factor(self.size.load(Ordering::Relaxed), capacity) {
            self.resize(capacity);
        }
        true
    }

    /// Removes a value from the set. Returns whether the value was present.
    pub fn remove(&self, value: &T) -> bool {
        let hash = self.build_hasher.hash_one(value);

        let mut table = self.table.lock().unwrap();
        if !table.remove(hash, value) {
            return false;
        }
        self.size.fetch_sub(1, Ordering::Relaxed);
        true
    }

    /// Returns `true` if the set contains the value.
    pub fn contains(&self, value: &T) -> bool {
        let hash = self.build_hasher.hash_one(value);
        self.table.lock().unwrap().contains(hash, value)
    }

    fn resize(&self, old_capacity: usize) {
        let mut table = self.table.lock().unwrap();

        // another thread already grew the table
        if table.capacity() != old_capacity {
            return;
        }

        table.grow(&self.build_hasher);
        self.capacity.store(table.capacity(), Ordering::Relaxed);
    }
}

impl<T, S> ConcurrentSet<T> for CoarseSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn insert(&self, value: T) -> bool {
        CoarseSet::insert(self, value)
    }

    fn remove(&self, value: &T) -> bool {
        CoarseSet::remove(self, value)
    }

    fn contains(&self, value: &T) -> bool {
        CoarseSet::contains(self, value)
    }

    fn len(&self) -> usize {
        CoarseSet::len(self)
    }
}

impl<T, S: Default> Default for CoarseSet<T, S> {
    fn default() -> Self {
        Self::with_capacity_and_hasher(1, S::default())
    }
}

impl<T, S> fmt::Debug for CoarseSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoarseSet")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

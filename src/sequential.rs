use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use crate::table::{self, Table};

/// An unsynchronized hash set.
///
/// This is the single-threaded reference implementation of the set contract
/// shared by [`CoarseSet`](crate::CoarseSet) and
/// [`RefinableSet`](crate::RefinableSet): the concurrent variants preserve
/// its observable behavior modulo interleavings.
///
/// # Examples
///
/// ```
/// use stripeset::SequentialSet;
///
/// let mut set = SequentialSet::with_capacity(16);
/// assert!(set.insert(42));
/// assert!(!set.insert(42));
/// assert!(set.contains(&42));
/// assert!(set.remove(&42));
/// assert_eq!(set.len(), 0);
/// ```
pub struct SequentialSet<T, S = RandomState> {
    table: Table<T>,
    size: usize,
    build_hasher: S,
}

impl<T> SequentialSet<T> {
    /// Creates an empty set with `capacity` buckets.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<T, S> SequentialSet<T, S> {
    /// Creates an empty set with `capacity` buckets, hashing elements with
    /// the given hash builder.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity_and_hasher(capacity: usize, build_hasher: S) -> Self {
        Self {
            table: Table::new(capacity),
            size: 0,
            build_hasher,
        }
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the current number of buckets. Grows by doubling whenever the
    /// load factor exceeds 4; never shrinks.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }
}

impl<T, S> SequentialSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Adds a value to the set. Returns whether the value was newly
    /// inserted.
    pub fn insert(&mut self, value: T) -> bool {
        let hash = self.build_hasher.hash_one(&value);
        if !self.table.insert(hash, value) {
            return false;
        }
        self.size += 1;

        if table::over_load_factor(self.size, self.table.capacity()) {
            self.table.grow(&self.build_hasher);
        }
        true
    }

    /// Removes a value from the set. Returns whether the value was present.
    pub fn remove(&mut self, value: &T) -> bool {
        let hash = self.build_hasher.hash_one(value);
        if !self.table.remove(hash, value) {
            return false;
        }
        self.size -= 1;
        true
    }

    /// Returns `true` if the set contains the value.
    pub fn contains(&self, value: &T) -> bool {
        let hash = self.build_hasher.hash_one(value);
        self.table.contains(hash, value)
    }
}

impl<T, S: Default> Default for SequentialSet<T, S> {
    fn default() -> Self {
        Self::with_capacity_and_hasher(1, S::default())
    }
}

impl<T: fmt::Debug, S> fmt::Debug for SequentialSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequentialSet")
            .field("len", &self.size)
            .field("capacity", &self.table.capacity())
            .finish()
    }
}

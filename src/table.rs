use std::hash::{BuildHasher, Hash};

/// Resize threshold: a table is grown once `size > MAX_LOAD_FACTOR * capacity`,
/// i.e. once the load factor strictly exceeds 4.
pub(crate) const MAX_LOAD_FACTOR: usize = 4;

/// Returns whether a table of `capacity` buckets holding `size` elements
/// is due for a resize. The comparison is strict: a load factor of exactly
/// 4 does not trigger.
pub(crate) fn over_load_factor(size: usize, capacity: usize) -> bool {
    size > MAX_LOAD_FACTOR * capacity
}

/// An array of element chains, indexed by `hash mod capacity`.
///
/// The table itself is unsynchronized; the sequential set uses it directly
/// and the coarse set wraps it in a mutex. Within one chain, elements are
/// pairwise non-equal.
#[derive(Debug)]
pub(crate) struct Table<T> {
    buckets: Box<[Vec<T>]>,
}

impl<T> Table<T> {
    /// Creates a table with `capacity` empty buckets.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "initial capacity must be positive");
        Self {
            buckets: (0..capacity).map(|_| Vec::new()).collect(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn bucket_index(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }
}

impl<T: Eq> Table<T> {
    pub(crate) fn contains(&self, hash: u64, value: &T) -> bool {
        self.buckets[self.bucket_index(hash)].contains(value)
    }

    /// Inserts `value` into its chain unless an equal element is already
    /// there. Returns whether the insertion happened.
    pub(crate) fn insert(&mut self, hash: u64, value: T) -> bool {
        let i = self.bucket_index(hash);
        let bucket = &mut self.buckets[i];
        if bucket.contains(&value) {
            return false;
        }
        bucket.push(value);
        true
    }

    /// Removes the element equal to `value` from its chain, if present.
    /// Returns whether the removal happened.
    pub(crate) fn remove(&mut self, hash: u64, value: &T) -> bool {
        let i = self.bucket_index(hash);
        let bucket = &mut self.buckets[i];
        match bucket.iter().position(|x| x == value) {
            Some(i) => {
                // chain order is irrelevant
                bucket.swap_remove(i);
                true
            }
            None => false,
        }
    }
}

impl<T: Hash + Eq> Table<T> {
    /// Doubles the number of buckets and rehashes every element into its
    /// new chain. The element count is unchanged.
    pub(crate) fn grow<S: BuildHasher>(&mut self, build_hasher: &S) {
        let mut new = Table::new(self.buckets.len() * 2);
        for bucket in self.buckets.iter_mut() {
            for value in bucket.drain(..) {
                let i = new.bucket_index(build_hasher.hash_one(&value));
                new.buckets[i].push(value);
            }
        }
        *self = new;
    }
}

#[cfg(test)]
mod tests {
    use super::{over_load_factor, Table};
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    #[test]
    #[should_panic(expected = "initial capacity must be positive")]
    fn zero_capacity_panics() {
        Table::<u64>::new(0);
    }

    #[test]
    fn insert_remove_contains() {
        let hasher = RandomState::new();
        let mut table = Table::new(4);

        for i in 0..10u64 {
            assert!(table.insert(hasher.hash_one(i), i));
            assert!(!table.insert(hasher.hash_one(i), i));
        }
        for i in 0..10u64 {
            assert!(table.contains(hasher.hash_one(i), &i));
        }
        assert!(!table.contains(hasher.hash_one(10u64), &10));

        assert!(table.remove(hasher.hash_one(3u64), &3));
        assert!(!table.remove(hasher.hash_one(3u64), &3));
        assert!(!table.contains(hasher.hash_one(3u64), &3));
    }

    #[test]
    fn grow_preserves_membership() {
        let hasher = RandomState::new();
        let mut table = Table::new(1);

        for i in 0..64u64 {
            assert!(table.insert(hasher.hash_one(i), i));
        }

        table.grow(&hasher);
        assert_eq!(table.capacity(), 2);
        table.grow(&hasher);
        assert_eq!(table.capacity(), 4);

        for i in 0..64u64 {
            assert!(table.contains(hasher.hash_one(i), &i));
        }
        assert!(!table.contains(hasher.hash_one(64u64), &64));
    }

    #[test]
    fn load_factor_threshold_is_strict() {
        assert!(!over_load_factor(16, 4));
        assert!(over_load_factor(17, 4));
        assert!(!over_load_factor(4, 1));
        assert!(over_load_factor(5, 1));
    }
}

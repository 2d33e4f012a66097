#![allow(dead_code)]

use std::hash::Hash;

use stripeset::{CoarseSet, ConcurrentSet, RefinableSet};

/// A shared handle to any concurrent set variant.
pub type DynSet<T> = Box<dyn ConcurrentSet<T> + Send + Sync>;

/// Runs the test against both concurrent variants, at several initial
/// capacities so the workload triggers a different number of resizes.
pub fn with_concurrent_set<T>(mut test: impl FnMut(&dyn Fn() -> DynSet<T>))
where
    T: Hash + Eq + Send + 'static,
{
    for capacity in [1, 4, 64] {
        test(&move || Box::new(CoarseSet::with_capacity(capacity)));
        test(&move || Box::new(RefinableSet::with_capacity(capacity)));
    }
}

/// Returns the number of threads to use for stress testing.
pub fn threads() -> usize {
    if cfg!(miri) {
        2
    } else {
        num_cpus::get_physical().next_power_of_two().min(8)
    }
}

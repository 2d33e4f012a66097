//! Mutable hash sets with identical external semantics under three
//! concurrency strategies.
//!
//! - [`SequentialSet`]: no synchronization; the single-threaded reference
//!   implementation.
//! - [`CoarseSet`]: one global mutex; the simplest concurrent strategy.
//! - [`RefinableSet`]: one lock per bucket ("striping"), with an online
//!   resize protocol that replaces the bucket and lock arrays while
//!   operations are in flight.
//!
//! All three grow by doubling once the load factor (elements per bucket,
//! on average) strictly exceeds 4, and never shrink. Hashing is pluggable
//! through a [`BuildHasher`](std::hash::BuildHasher) parameter, defaulting
//! to [`RandomState`](std::collections::hash_map::RandomState).
//!
//! # Usage
//!
//! ```
//! use stripeset::{ConcurrentSet, RefinableSet};
//! use std::thread;
//!
//! let set = RefinableSet::with_capacity(4);
//!
//! thread::scope(|s| {
//!     for t in 0..4 {
//!         let set = &set;
//!         s.spawn(move || {
//!             for i in 0..100 {
//!                 set.insert(t * 100 + i);
//!             }
//!         });
//!     }
//! });
//!
//! assert_eq!(set.len(), 400);
//! assert!(set.contains(&0));
//! ```

mod coarse;
mod markable;
mod refinable;
mod sequential;
mod table;

pub use coarse::CoarseSet;
pub use refinable::RefinableSet;
pub use sequential::SequentialSet;

/// The contract shared by the concurrent set variants.
///
/// All operations take `&self` and are safe to call from any number of
/// threads. Duplicate inserts and absent removals are not errors; they are
/// signaled through the boolean return values.
pub trait ConcurrentSet<T> {
    /// Adds the value to the set. Returns whether the value was newly
    /// inserted.
    fn insert(&self, value: T) -> bool;

    /// Removes the value from the set. Returns whether the value was
    /// present.
    fn remove(&self, value: &T) -> bool;

    /// Returns `true` iff the set contains the value.
    fn contains(&self, value: &T) -> bool;

    /// Returns the number of elements in the set. May be stale relative to
    /// in-flight operations on other threads.
    fn len(&self) -> usize;

    /// Returns `true` if the set contains no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

/// An atomically updated `(value, mark)` pair.
///
/// The value and the mark are packed into a single 64-bit word, so every
/// operation reads or replaces both fields together: a reader can never
/// observe a new value paired with an old mark, or vice versa. Values are
/// limited to 63 bits.
///
/// This is the coordination primitive behind the refinable set's resize
/// ownership flag, where the value identifies the owning thread and the
/// mark records whether a resize is in flight.
pub(crate) struct MarkableCell {
    state: AtomicU64,
}

const MARK: u64 = 1;

fn pack(value: u64, mark: bool) -> u64 {
    debug_assert!(value <= u64::MAX >> 1, "markable value exceeds 63 bits");
    (value << 1) | (mark as u64)
}

fn unpack(state: u64) -> (u64, bool) {
    (state >> 1, state & MARK == MARK)
}

impl MarkableCell {
    /// Creates a cell holding the given value and mark.
    pub(crate) fn new(value: u64, mark: bool) -> Self {
        Self {
            state: AtomicU64::new(pack(value, mark)),
        }
    }

    /// Returns the current value and mark, read together atomically.
    pub(crate) fn get(&self) -> (u64, bool) {
        unpack(self.state.load(Ordering::SeqCst))
    }

    /// Returns the current value.
    pub(crate) fn value(&self) -> u64 {
        self.get().0
    }

    /// Returns the current mark.
    pub(crate) fn is_marked(&self) -> bool {
        self.get().1
    }

    /// Unconditionally replaces both the value and the mark.
    pub(crate) fn set(&self, value: u64, mark: bool) {
        self.state.store(pack(value, mark), Ordering::SeqCst);
    }

    /// Replaces the pair iff the current pair equals
    /// `(expected_value, expected_mark)`. Returns whether the replacement
    /// occurred.
    pub(crate) fn compare_and_set(
        &self,
        expected_value: u64,
        new_value: u64,
        expected_mark: bool,
        new_mark: bool,
    ) -> bool {
        self.state
            .compare_exchange(
                pack(expected_value, expected_mark),
                pack(new_value, new_mark),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

impl std::fmt::Debug for MarkableCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (value, mark) = self.get();
        f.debug_struct("MarkableCell")
            .field("value", &value)
            .field("mark", &mark)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::MarkableCell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn get_returns_both_fields() {
        let cell = MarkableCell::new(7, true);
        assert_eq!(cell.get(), (7, true));
        assert_eq!(cell.value(), 7);
        assert!(cell.is_marked());
    }

    #[test]
    fn set_replaces_both_fields() {
        let cell = MarkableCell::new(0, false);
        cell.set(42, true);
        assert_eq!(cell.get(), (42, true));
        cell.set(0, false);
        assert_eq!(cell.get(), (0, false));
    }

    #[test]
    fn compare_and_set_requires_both_fields_to_match() {
        let cell = MarkableCell::new(1, false);

        // wrong value
        assert!(!cell.compare_and_set(2, 3, false, true));
        // wrong mark
        assert!(!cell.compare_and_set(1, 3, true, true));
        assert_eq!(cell.get(), (1, false));

        assert!(cell.compare_and_set(1, 3, false, true));
        assert_eq!(cell.get(), (3, true));
    }

    #[test]
    fn large_values_roundtrip() {
        let max = u64::MAX >> 1;
        let cell = MarkableCell::new(max, false);
        assert_eq!(cell.get(), (max, false));
        assert!(cell.compare_and_set(max, max - 1, false, true));
        assert_eq!(cell.get(), (max - 1, true));
    }

    // Races threads on the cell the way the resize protocol does: exactly
    // one thread may move it from unowned to owned.
    #[test]
    fn exactly_one_cas_wins() {
        let threads = if cfg!(miri) { 2 } else { 8 };

        for _ in 0..if cfg!(miri) { 4 } else { 100 } {
            let cell = MarkableCell::new(0, false);
            let winners = AtomicUsize::new(0);

            thread::scope(|s| {
                for id in 1..=threads {
                    let cell = &cell;
                    let winners = &winners;
                    s.spawn(move || {
                        if cell.compare_and_set(0, id as u64, false, true) {
                            winners.fetch_add(1, Ordering::Relaxed);
                        }
                    });
                }
            });

            assert_eq!(winners.load(Ordering::Relaxed), 1);
            let (owner, marked) = cell.get();
            assert!(marked);
            assert!((1..=threads as u64).contains(&owner));
        }
    }
}

//! Capacity growth policy.
//!
//! Two pure functions decide when a buffer must grow and how large the
//! new storage is. The buffer engine calls them; they are public so the
//! policy can be inspected and tested without touching memory.

/// Divisor of the multiplicative growth step: a full buffer gains
/// `capacity / GROWTH_DIVISOR` slots, i.e. roughly 1.5x.
pub const GROWTH_DIVISOR: usize = 2;

/// Slots always added on growth, so an empty buffer makes progress.
pub const MIN_GROWTH_STEP: usize = 1;

/// Whether `additional` more elements require new storage.
///
/// Growth triggers once `len + additional` reaches `capacity`, not only
/// when it exceeds it, so a buffer that has just grown always keeps one
/// spare slot. An unrepresentable `len + additional` always needs growth.
pub fn needs_growth(len: usize, capacity: usize, additional: usize) -> bool {
    len.checked_add(additional)
        .is_none_or(|needed| needed >= capacity)
}

/// Capacity to grow to from `capacity` when `additional` slots are wanted.
///
/// The larger of `capacity + capacity / 2 + 1` and `capacity + additional`.
/// Returns `None` on arithmetic overflow.
pub fn grown_capacity(capacity: usize, additional: usize) -> Option<usize> {
    let stepped = capacity
        .checked_add(capacity / GROWTH_DIVISOR)?
        .checked_add(MIN_GROWTH_STEP)?;
    let requested = capacity.checked_add(additional)?;
    Some(stepped.max(requested))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_grows_to_one() {
        assert_eq!(grown_capacity(0, 1), Some(1));
        assert_eq!(grown_capacity(0, 0), Some(1));
    }

    #[test]
    fn grows_by_half_plus_one() {
        assert_eq!(grown_capacity(1, 1), Some(2));
        assert_eq!(grown_capacity(2, 1), Some(4));
        assert_eq!(grown_capacity(30, 1), Some(46));
        assert_eq!(grown_capacity(300, 50), Some(451));
    }

    #[test]
    fn large_request_wins_over_step() {
        assert_eq!(grown_capacity(4, 100), Some(104));
        assert_eq!(grown_capacity(300, 200), Some(500));
    }

    #[test]
    fn overflow_is_none() {
        assert_eq!(grown_capacity(usize::MAX, 1), None);
        assert_eq!(grown_capacity(10, usize::MAX), None);
    }

    #[test]
    fn exact_fit_still_grows() {
        // 29 live + 1 more reaches capacity 30: grow.
        assert!(needs_growth(29, 30, 1));
        assert!(!needs_growth(28, 30, 1));
        assert!(needs_growth(30, 30, 0));
    }

    #[test]
    fn zero_capacity_always_needs_growth() {
        assert!(needs_growth(0, 0, 0));
        assert!(needs_growth(0, 0, 1));
    }

    #[test]
    fn length_overflow_needs_growth() {
        assert!(needs_growth(usize::MAX, usize::MAX, 1));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn growth_satisfies_request_and_factor(
                capacity in 0usize..1_000_000,
                additional in 0usize..1_000_000,
            ) {
                let grown = grown_capacity(capacity, additional).unwrap();
                prop_assert!(grown >= capacity + capacity / 2 + 1);
                prop_assert!(grown >= capacity + additional);
                prop_assert!(grown > capacity);
            }

            #[test]
            fn after_growth_request_no_longer_triggers(
                len in 0usize..10_000,
                extra in 0usize..10_000,
                additional in 1usize..10_000,
            ) {
                let capacity = len + extra;
                if needs_growth(len, capacity, additional) {
                    let grown = grown_capacity(capacity, additional).unwrap();
                    prop_assert!(len + additional <= grown);
                }
            }
        }
    }
}

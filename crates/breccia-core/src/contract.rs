//! The [`contract_assert!`] macro.

/// Assert a caller contract that is checked in debug/checked builds only.
///
/// Capacity and ordering contracts in hot paths (container growth, heap
/// operations, dirty-list bookkeeping) are validated with this macro rather
/// than a recoverable error path. Under `debug_assertions`, or when the
/// `checked` feature of `breccia-core` is enabled, a violation panics with
/// the assertion message. Otherwise the check compiles to nothing and the
/// violating operation falls through to ordinary slice indexing, whose
/// bounds check is the backstop.
///
/// Use the sizing APIs (`required_memory_size`, `family_memory_size`,
/// serialization size functions) to avoid violations in the first place.
#[macro_export]
macro_rules! contract_assert {
    ($cond:expr) => {
        if $crate::contract_checks_enabled() {
            assert!($cond);
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if $crate::contract_checks_enabled() {
            assert!($cond, $($arg)+);
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn passing_condition_is_silent() {
        contract_assert!(1 + 1 == 2);
    }

    #[test]
    #[cfg_attr(not(debug_assertions), ignore = "checks compiled out")]
    #[should_panic(expected = "capacity")]
    fn failing_condition_panics_when_checked() {
        contract_assert!(false, "capacity exceeded");
    }
}

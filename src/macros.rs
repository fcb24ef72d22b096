/// Signals a broken internal invariant. Distinct from a [`crate::error::MergeEngineError`]:
/// those are expected failure modes a caller can match on, this is a bug in the engine itself.
macro_rules! bug {
    ($($arg:tt)*) => {{
        log::error!("BUG: {}", format!($($arg)*));
        panic!("internal invariant violated: {}", format!($($arg)*))
    }};
}

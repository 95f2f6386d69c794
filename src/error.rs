//! Fatal-error handling for protocol violations.
//!
//! Expected races and expected denials are just logged and handled as ordinary
//! control flow. A protocol violation is different: it means the state machine
//! has been corrupted, and the process must stop. This crate panics on a protocol
//! violation — catchable in tests, still fatal to an embedder that lets the
//! unwind propagate off the collector thread.

/// Log a protocol violation at `error!` and then panic with the same message.
///
/// Used only for conditions that can't happen unless some caller bypassed the
/// state machine's invariants (e.g. a CAS in `Collector::perform_full_gc` failing
/// with an expected-state mismatch that is not one of the two tolerated races).
macro_rules! fatal {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        log::error!("{}", msg);
        panic!("{}", msg);
    }};
}

pub(crate) use fatal;

//! Small helpers that work around the absence of certain nightly-only compiler
//! intrinsics on stable Rust.

#[cold]
fn cold() {}

/// Compiler hint that `b` is almost always `true`. Used on the safepoint hot path,
/// where `need_slow_path` is false far more often than it is true.
#[inline(always)]
pub fn likely(b: bool) -> bool {
    if !b {
        cold();
    }
    b
}

/// Compiler hint that `b` is almost always `false`.
#[inline(always)]
pub fn unlikely(b: bool) -> bool {
    if b {
        cold();
    }
    b
}

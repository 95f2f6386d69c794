//! `Phase` and `StateCell` — the GC state machine shared across mutators and the
//! collector thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// The GC phase. Only a fixed set of transitions between these variants is legal;
/// any other transition is a protocol violation and must be treated as fatal by
/// the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Idle; no GC in progress; mutators may run freely.
    None,
    /// A GC has been requested; the collector thread is expected to pick it up.
    NeedsGc,
    /// The collector has begun; waiting for all mutators to suspend.
    NeedsSuspend,
    /// Reserved: representable but not entered by this collector variant. Kept so
    /// the state machine stays extensible to collectors that separate "all
    /// threads paused" from "mark/sweep running".
    WorldIsStopped,
    /// All mutators are suspended; mark and sweep are executing.
    GcRunning,
    /// GC is complete and mutators are resuming, but the finalizer queue is
    /// nonempty.
    NeedsFinalizersRun,
    /// Terminal: the collector thread must exit.
    Shutdown,
}

impl Phase {
    /// True exactly when a mutator at its safepoint must take the slow path.
    fn needs_slow_path(self) -> bool {
        matches!(self, Phase::NeedsSuspend | Phase::NeedsFinalizersRun)
    }
}

/// A cell holding the current phase plus a mutex and condition variable, and a
/// lock-free `need_slow_path` flag derived from the phase on every successful
/// transition.
///
/// `need_slow_path` is kept in its own `Arc<AtomicBool>` rather than inside the
/// mutex so mutators can poll it from a hot path without ever touching the lock.
/// It is owned by the `StateCell` instance (not a process-wide global) and shared
/// via `Arc` with whoever needs the lock-free read, which keeps multiple
/// independent collector instances safe to run in the same process.
pub struct StateCell {
    phase: Mutex<Phase>,
    cond: Condvar,
    need_slow_path: Arc<AtomicBool>,
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(Phase::None),
            cond: Condvar::new(),
            need_slow_path: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle mutators can read from without ever touching the mutex.
    pub fn need_slow_path_flag(&self) -> Arc<AtomicBool> {
        self.need_slow_path.clone()
    }

    /// Wait-free: may be called from any thread, including inside safepoints.
    pub fn get(&self) -> Phase {
        *self.phase.lock().unwrap()
    }

    /// Atomically transition from `expected` to `desired`.
    ///
    /// On success, recomputes `need_slow_path` under the mutex, broadcasts the
    /// condition so every waiter wakes, and returns `(true, desired)`. On failure,
    /// returns `(false, observed)` where `observed` is the actual current phase,
    /// left unchanged.
    pub fn compare_and_swap(&self, expected: Phase, desired: Phase) -> (bool, Phase) {
        let mut guard = self.phase.lock().unwrap();
        if *guard == expected {
            *guard = desired;
            self.need_slow_path
                .store(desired.needs_slow_path(), Ordering::SeqCst);
            self.cond.notify_all();
            (true, desired)
        } else {
            (false, *guard)
        }
    }

    /// Block on the condition until `predicate` returns true when evaluated under
    /// the mutex; optionally run `after` under the mutex before unlocking; return
    /// the phase at release.
    ///
    /// On a `threaded` build this really blocks. On a no-threads build this is a
    /// no-op that evaluates `predicate` once (spuriously, if it is false) and
    /// returns the current phase immediately.
    #[cfg(feature = "threaded")]
    pub fn wait_until<P, A>(&self, mut predicate: P, after: A) -> Phase
    where
        P: FnMut(Phase) -> bool,
        A: FnOnce(&mut MutexGuard<'_, Phase>),
    {
        let mut guard = self.phase.lock().unwrap();
        while !predicate(*guard) {
            guard = self.cond.wait(guard).unwrap();
        }
        after(&mut guard);
        *guard
    }

    #[cfg(not(feature = "threaded"))]
    #[allow(unused_mut, unused_variables)]
    pub fn wait_until<P, A>(&self, mut predicate: P, after: A) -> Phase
    where
        P: FnMut(Phase) -> bool,
        A: FnOnce(&mut MutexGuard<'_, Phase>),
    {
        let mut guard = self.phase.lock().unwrap();
        let _ = predicate(*guard);
        after(&mut guard);
        *guard
    }

    /// `wait_until` without an `after` closure.
    pub fn wait_until_simple<P>(&self, predicate: P) -> Phase
    where
        P: FnMut(Phase) -> bool,
    {
        self.wait_until(predicate, |_| {})
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

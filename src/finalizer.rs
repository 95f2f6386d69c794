//! `FinalizerQueue` — a single slot of swept nodes awaiting finalization, handed
//! off from the collector (producer) to whichever mutator next drains it
//! (consumer).

use std::sync::Mutex;

/// Ownership transfers from the collector, which writes to the slot only while
/// the world is stopped, to a single consuming mutator, which swaps the whole
/// queue onto its own stack under the `StateCell` mutex before running any
/// finalizer. No per-finalizer synchronization is required: once a consumer has
/// swapped the queue out, the slot is empty and the next sweep may fill it.
pub struct FinalizerQueue<N> {
    slot: Mutex<Vec<N>>,
}

impl<N> FinalizerQueue<N> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Vec::new()),
        }
    }

    /// Called by the collector, during sweep, to append a swept, unreachable node
    /// to the queue. Only valid while the world is stopped.
    pub(crate) fn push(&self, node: N) {
        self.slot.lock().unwrap().push(node);
    }

    /// Take exclusive ownership of every node currently queued, leaving the slot
    /// empty. Called by the winner of the `NeedsFinalizersRun -> None` CAS.
    pub(crate) fn take(&self) -> Vec<N> {
        std::mem::take(&mut *self.slot.lock().unwrap())
    }

    /// Number of nodes currently queued. Read by the collector immediately after
    /// sweeping to decide the next phase.
    pub(crate) fn len(&self) -> usize {
        self.slot.lock().unwrap().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<N> Default for FinalizerQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

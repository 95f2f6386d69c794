//! `SafepointProtocol` — inline entry points for the compiler/runtime to emit
//! into generated code, plus the non-inlined slow path and the explicit
//! "collect now" path used for OOM handling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::collector::Collector;
use crate::error::fatal;
use crate::finalizer::FinalizerQueue;
use crate::state::{Phase, StateCell};
use crate::util::rust_util::unlikely;
use crate::vm::{Collaborators, GcScheduler, Heap, Suspension};

/// Opaque weight passed from a function prologue, recognized by the scheduler for
/// time-based sampling.
pub const W_PROLOGUE: u32 = 1;
/// Opaque weight passed from a loop back-edge.
pub const W_LOOP: u32 = 1;

/// Per-mutator-thread handle exposing the three inline entry points plus the
/// explicit OOM path. One instance is owned by each mutator thread; it borrows
/// the process-wide GC state shared with the collector and every other mutator.
pub struct SafepointProtocol<C: Collaborators> {
    state: Arc<StateCell>,
    need_slow_path: Arc<AtomicBool>,
    finalizer_queue: Arc<FinalizerQueue<C::Node>>,
    suspension: Arc<C::Suspension>,
    scheduler: Arc<C::GcScheduler>,
    heap: Arc<C::Heap>,
    collector: Arc<Collector<C>>,
}

impl<C: Collaborators> SafepointProtocol<C> {
    pub(crate) fn new(
        state: Arc<StateCell>,
        finalizer_queue: Arc<FinalizerQueue<C::Node>>,
        suspension: Arc<C::Suspension>,
        scheduler: Arc<C::GcScheduler>,
        heap: Arc<C::Heap>,
        collector: Arc<Collector<C>>,
    ) -> Self {
        let need_slow_path = state.need_slow_path_flag();
        Self {
            state,
            need_slow_path,
            finalizer_queue,
            suspension,
            scheduler,
            heap,
            collector,
        }
    }

    /// Called on function entry.
    #[inline(always)]
    pub fn prologue(&self) {
        self.safepoint_regular(W_PROLOGUE);
    }

    /// Called on each loop back-edge.
    #[inline(always)]
    pub fn loop_body(&self) {
        self.safepoint_regular(W_LOOP);
    }

    /// Called after every heap allocation.
    pub fn allocation(&self, size: usize) {
        self.scheduler.on_safepoint_allocation(size);
        if unlikely(self.need_slow_path.load(Ordering::Relaxed)) {
            self.safepoint_slow_path();
        }
    }

    #[inline(always)]
    fn safepoint_regular(&self, weight: u32) {
        self.scheduler.on_safepoint_regular(weight);
        if unlikely(self.need_slow_path.load(Ordering::Relaxed)) {
            self.safepoint_slow_path();
        }
    }

    /// The non-inlined branch taken only when `need_slow_path` is true.
    #[inline(never)]
    fn safepoint_slow_path(&self) {
        let phase = self.state.get();

        if phase == Phase::None {
            return; // Spurious wake.
        }

        // No need to check for `NeedsSuspend` here: `suspend_self_if_requested`
        // checks its own flag independently.
        if phase == Phase::NeedsFinalizersRun {
            let (won, _) = self.state.compare_and_swap(phase, Phase::None);
            if won {
                // Move the queue to a local before running any finalizer, so a
                // finalizer that triggers another GC cannot observe a torn queue.
                let queue = self.finalizer_queue.take();
                let queue_len = queue.len();
                let start = std::time::Instant::now();
                for node in queue {
                    self.heap.finalize(node);
                }
                log::debug!(
                    "Finalized {} objects in {} microseconds.",
                    queue_len,
                    start.elapsed().as_micros()
                );
            }
        }

        self.suspension.suspend_self_if_requested();

        // The re-read only matters on a no-threads build: there, the winner of
        // the `NeedsFinalizersRun -> None` CAS above may have just driven the
        // phase back to `NeedsGc` synchronously, and this is the only place left
        // to notice it and run the cycle inline.
        #[cfg(not(feature = "threaded"))]
        {
            let phase = self.state.get();
            if phase == Phase::NeedsGc {
                log::debug!("Attempt to GC at safepoint (no-threads mode).");
                self.collector.perform_full_gc();
            }
        }
    }

    /// An explicit "collect now" path for out-of-memory handling.
    pub fn schedule_and_wait_full_gc(&self) {
        let mut phase = self.state.get();
        loop {
            if matches!(phase, Phase::NeedsGc | Phase::NeedsSuspend) {
                break;
            }
            if !matches!(phase, Phase::None | Phase::GcRunning) {
                // A finalizer-pending phase: drain it first, then retry.
                self.safepoint_regular(0);
                phase = self.state.get();
                continue;
            }
            let (_, observed) = self.state.compare_and_swap(phase, Phase::NeedsGc);
            phase = observed;
        }

        // On a no-threads build there is no collector thread to pick `kNeedsGC`
        // up: this caller drives the cycle to completion itself, synchronously.
        #[cfg(not(feature = "threaded"))]
        {
            if phase == Phase::NeedsGc {
                self.collector.perform_full_gc();
            }
            self.safepoint_regular(0);
            return;
        }

        #[cfg(feature = "threaded")]
        {
            let phase = self.state.wait_until_simple(|p| p != Phase::NeedsGc);
            if phase != Phase::NeedsSuspend {
                fatal!(
                    "Not suspended: someone started GC, but no suspension was requested (phase = {:?})",
                    phase
                );
            }

            self.suspension.suspend_self_if_requested();
            self.state.wait_until_simple(|p| p != Phase::GcRunning);
            self.safepoint_regular(0);
        }
    }

    /// Attempt a full GC specifically because an allocation failed. A thin,
    /// separately-named wrapper over `schedule_and_wait_full_gc` so the log line
    /// records *why* the collection was forced.
    pub fn on_oom(&self, size: usize) {
        log::debug!("Attempt to GC on OOM at size={}", size);
        self.schedule_and_wait_full_gc();
    }
}

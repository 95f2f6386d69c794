//! `GcCore` ties every component together into the single entry point an
//! embedder constructs once per heap.

use std::sync::Arc;

#[cfg(feature = "threaded")]
use std::thread::JoinHandle;

use crate::collector::Collector;
use crate::finalizer::FinalizerQueue;
use crate::safepoint::SafepointProtocol;
use crate::state::{Phase, StateCell};
use crate::util::logger;
use crate::vm::{Collaborators, GcScheduler};

/// Owns the shared state cell, the finalizer hand-off slot, and the collector,
/// and hands out a fresh [`SafepointProtocol`] to every mutator thread that asks
/// for one. One `GcCore` corresponds to one independently collected heap; nothing
/// in this crate is a process-wide global, so an embedder may run more than one
/// side by side if it wishes.
pub struct GcCore<C: Collaborators> {
    state: Arc<StateCell>,
    finalizer_queue: Arc<FinalizerQueue<C::Node>>,
    suspension: Arc<C::Suspension>,
    scheduler: Arc<C::GcScheduler>,
    heap: Arc<C::Heap>,
    collector: Arc<Collector<C>>,
    #[cfg(feature = "threaded")]
    collector_thread: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<C: Collaborators> GcCore<C> {
    /// Construct a `GcCore`, registering a `schedule_gc` callback with the
    /// scheduler and, on a `threaded` build, spawning the dedicated collector
    /// thread. On a no-threads build there is no thread to spawn: the scheduler's
    /// callback still flips the phase to `NeedsGc`, but nothing drains it until
    /// the next safepoint slow path runs the collection inline.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        heap: Arc<C::Heap>,
        extra_objects: Arc<C::ExtraObjects>,
        thread_registry: Arc<C::ThreadRegistry>,
        global_roots: Arc<C::GlobalRoots>,
        suspension: Arc<C::Suspension>,
        scheduler: Arc<C::GcScheduler>,
    ) -> Arc<Self> {
        logger::try_init();

        let state = Arc::new(StateCell::new());
        let finalizer_queue = Arc::new(FinalizerQueue::new());
        let collector = Arc::new(Collector::new(
            state.clone(),
            finalizer_queue.clone(),
            heap.clone(),
            extra_objects,
            thread_registry,
            global_roots,
            suspension.clone(),
            scheduler.clone(),
        ));

        let core = Arc::new(Self {
            state: state.clone(),
            finalizer_queue,
            suspension,
            scheduler: scheduler.clone(),
            heap,
            collector: collector.clone(),
            #[cfg(feature = "threaded")]
            collector_thread: std::sync::Mutex::new(None),
        });

        let schedule_state = state;
        scheduler.set_schedule_gc(Arc::new(move || {
            let (won, _) = schedule_state.compare_and_swap(Phase::None, Phase::NeedsGc);
            if won {
                log::debug!("Scheduler requested a GC.");
            }
        }));

        #[cfg(feature = "threaded")]
        {
            let thread_collector = collector;
            let handle = std::thread::Builder::new()
                .name("stopgc-collector".to_string())
                .spawn(move || thread_collector.run())
                .expect("failed to spawn collector thread");
            *core.collector_thread.lock().unwrap() = Some(handle);
        }

        core
    }

    /// Build a fresh per-mutator-thread safepoint handle. Cheap: it only clones a
    /// handful of `Arc`s.
    pub fn new_safepoint(&self) -> SafepointProtocol<C> {
        SafepointProtocol::new(
            self.state.clone(),
            self.finalizer_queue.clone(),
            self.suspension.clone(),
            self.scheduler.clone(),
            self.heap.clone(),
            self.collector.clone(),
        )
    }

    /// The number of completed collection cycles.
    pub fn epoch(&self) -> u64 {
        self.collector.epoch()
    }

    #[cfg(test)]
    pub(crate) fn state_for_testing(&self) -> Arc<StateCell> {
        self.state.clone()
    }
}

impl<C: Collaborators> Drop for GcCore<C> {
    /// Wait for a quiescent phase — `None` or `NeedsFinalizersRun`, i.e. no
    /// collection is actively in flight — then transition to `Shutdown` so the
    /// collector thread's main loop exits, and join it.
    ///
    /// Waiting on `NeedsFinalizersRun` too (rather than only `None`) means
    /// shutdown never blocks forever behind a mutator that never happens to hit
    /// another safepoint to drain the last finalizer batch; pending finalizers
    /// are simply dropped unrun.
    fn drop(&mut self) {
        loop {
            let quiescent = self
                .state
                .wait_until_simple(|p| matches!(p, Phase::None | Phase::NeedsFinalizersRun));
            let (ok, _) = self.state.compare_and_swap(quiescent, Phase::Shutdown);
            if ok {
                break;
            }
            // Someone moved the phase again between the wait and the CAS; retry.
        }

        #[cfg(feature = "threaded")]
        if let Some(handle) = self.collector_thread.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

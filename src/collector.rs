//! `Collector` — the GC thread (or, on a no-threads build, the inline
//! implementation of a single collection cycle run by whichever mutator drives
//! it).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::error::fatal;
use crate::finalizer::FinalizerQueue;
use crate::mark;
use crate::state::{Phase, StateCell};
use crate::sweep;
use crate::vm::{Collaborators, GcScheduler, GlobalRoots, Heap, MutatorRoots, Suspension, ThreadRegistry};

/// Counts and timings from one completed collection, returned to the caller of
/// `Collector::perform_full_gc` for logging and (in tests) assertions, so callers
/// do not have to re-derive them from the log output.
#[derive(Debug, Clone, Copy)]
pub struct GcStats {
    pub epoch: u64,
    pub objects_before: usize,
    pub objects_after: usize,
    pub finalizer_count: usize,
    pub collected_count: usize,
    pub pause_micros: u64,
}

pub struct Collector<C: Collaborators> {
    state: Arc<StateCell>,
    finalizer_queue: Arc<FinalizerQueue<C::Node>>,
    heap: Arc<C::Heap>,
    extra_objects: Arc<C::ExtraObjects>,
    thread_registry: Arc<C::ThreadRegistry>,
    global_roots: Arc<C::GlobalRoots>,
    suspension: Arc<C::Suspension>,
    scheduler: Arc<C::GcScheduler>,
    epoch: AtomicU64,
    last_gc_timestamp: Mutex<Option<Instant>>,
}

impl<C: Collaborators> Collector<C> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        state: Arc<StateCell>,
        finalizer_queue: Arc<FinalizerQueue<C::Node>>,
        heap: Arc<C::Heap>,
        extra_objects: Arc<C::ExtraObjects>,
        thread_registry: Arc<C::ThreadRegistry>,
        global_roots: Arc<C::GlobalRoots>,
        suspension: Arc<C::Suspension>,
        scheduler: Arc<C::GcScheduler>,
    ) -> Self {
        Self {
            state,
            finalizer_queue,
            heap,
            extra_objects,
            thread_registry,
            global_roots,
            suspension,
            scheduler,
            epoch: AtomicU64::new(0),
            last_gc_timestamp: Mutex::new(None),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// The collector thread's main loop:
    ///
    /// ```text
    /// forever:
    ///   phase <- StateCell.wait_until(phase in {NeedsGc, Shutdown})
    ///   if phase == Shutdown: exit
    ///   if phase == NeedsGc:  perform_full_gc()
    ///   else: fatal (bug)
    /// ```
    #[cfg(feature = "threaded")]
    pub(crate) fn run(&self) {
        loop {
            let phase = self
                .state
                .wait_until_simple(|p| matches!(p, Phase::NeedsGc | Phase::Shutdown));
            match phase {
                Phase::Shutdown => {
                    log::debug!("Collector thread shutting down.");
                    return;
                }
                Phase::NeedsGc => {
                    self.perform_full_gc();
                }
                other => fatal!("GC thread woke up in strange state {:?}", other),
            }
        }
    }

    /// One full collection cycle: request and wait for suspension, collect roots,
    /// mark, sweep, hand off finalizers, and resume.
    ///
    /// Returns `None` if another collection is already in progress (an expected
    /// denial) — this should not happen with a single collector thread, but the
    /// check is retained for composability with future variants that might run
    /// more than one collector.
    pub fn perform_full_gc(&self) -> Option<GcStats> {
        let time_start = Instant::now();
        log::debug!("Attempt to suspend threads.");

        if !self.suspension.request_suspension() {
            log::debug!("Failed to suspend threads: someone else already requested suspension.");
            return None;
        }
        log::debug!("Requested thread suspension.");

        let (ok, _) = self.state.compare_and_swap(Phase::NeedsGc, Phase::NeedsSuspend);
        if !ok {
            fatal!("Someone stole kNeedsGC state before moving to kNeedsSuspend");
        }

        // The collector thread is not itself a registered mutator; it never calls
        // into `ThreadRegistry`, so it is implicitly excluded from the suspension
        // census.

        self.suspension.wait_for_all_suspended();
        let time_suspend = Instant::now();
        log::debug!(
            "Suspended all threads in {} microseconds.",
            (time_suspend - time_start).as_micros()
        );

        self.scheduler.on_perform_full_gc();

        let last = *self.last_gc_timestamp.lock().unwrap();
        let since_last = last.map(|t| (time_start - t).as_micros()).unwrap_or(0);
        log::info!(
            "Started GC epoch {}. Time since last GC {} microseconds.",
            self.epoch(),
            since_last
        );

        let mut gray: Vec<C::Node> = Vec::new();

        self.thread_registry.for_each_mutator(&mut |mutator| {
            mutator.publish_tlab();
            self.scheduler.on_stopped_for_gc();
            let mut count = 0usize;
            mutator.for_each_root(&mut |root| {
                gray.push(root);
                count += 1;
            });
            log::debug!("Collected root set for thread: {} roots.", count);
        });

        self.global_roots.process_stable_ref_deletions();
        let mut global_count = 0usize;
        self.global_roots.for_each_global_root(&mut |root| {
            gray.push(root);
            global_count += 1;
        });
        let time_root_set = Instant::now();
        log::debug!(
            "Collected global root set: {} roots in {} microseconds.",
            global_count,
            (time_root_set - time_suspend).as_micros()
        );

        // Safe to read now: the world is stopped.
        let objects_before = self.heap.node_count();
        log::info!(
            "Collected root set of size {} in {} microseconds.",
            gray.len(),
            (time_root_set - time_suspend).as_micros()
        );

        mark::mark(&*self.heap, gray);
        let time_mark = Instant::now();
        log::debug!(
            "Marked in {} microseconds.",
            (time_mark - time_root_set).as_micros()
        );

        sweep::sweep_extra_objects(&*self.extra_objects);
        let time_sweep_extra = Instant::now();
        log::debug!(
            "Swept extra objects in {} microseconds.",
            (time_sweep_extra - time_mark).as_micros()
        );

        let mut swept: Vec<C::Node> = Vec::new();
        sweep::sweep_main_heap(&*self.heap, &mut swept);
        let time_sweep = Instant::now();
        log::debug!(
            "Swept in {} microseconds.",
            (time_sweep - time_sweep_extra).as_micros()
        );

        let finalizer_count = swept.len();
        for node in swept {
            self.finalizer_queue.push(node);
        }

        // Safe to read now: the world is stopped.
        let objects_after = self.heap.node_count();

        let (ok, _) = self
            .state
            .compare_and_swap(Phase::NeedsSuspend, Phase::GcRunning);
        if !ok {
            fatal!("Someone changed kNeedsSuspend during the stop-the-world phase");
        }

        let next_phase = if self.finalizer_queue.is_empty() {
            Phase::None
        } else {
            Phase::NeedsFinalizersRun
        };
        let (ok, _) = self.state.compare_and_swap(Phase::GcRunning, next_phase);
        if !ok {
            log::debug!("A new GC is already scheduled while finishing the previous one.");
        }

        self.suspension.resume_all();
        let time_resume = Instant::now();
        log::debug!(
            "Resumed threads in {} microseconds.",
            (time_resume - time_sweep).as_micros()
        );

        // The heap does not actually shrink until a mutator later drains the
        // finalizer queue and calls `Heap::finalize` on each node, so
        // `objects_after` still counts everything just queued here. Nothing is
        // reclaimed synchronously by this cycle; `saturating_sub` keeps that
        // honest instead of underflowing when `finalizer_count > 0`.
        let collected_count = objects_before
            .saturating_sub(objects_after)
            .saturating_sub(finalizer_count);
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst);
        *self.last_gc_timestamp.lock().unwrap() = Some(time_resume);

        log::info!(
            "Finished GC epoch {}. Collected {} objects, {} pending finalization, {} remain. Total pause time {} microseconds.",
            epoch,
            collected_count,
            finalizer_count,
            objects_after,
            (time_resume - time_start).as_micros()
        );

        Some(GcStats {
            epoch,
            objects_before,
            objects_after,
            finalizer_count,
            collected_count,
            pause_micros: (time_resume - time_start).as_micros() as u64,
        })
    }
}

//! A minimal no-op set of collaborators, exposed only behind the `test_private`
//! feature, so `benches/safepoint.rs` can construct a real [`crate::GcCore`] and
//! time the hot safepoint path without needing a full embedder.

use std::sync::Arc;

use crate::vm::{Collaborators, Color, ExtraObjects, GcScheduler, GlobalRoots, Heap, MutatorRoots, Suspension, ThreadRegistry};

#[derive(Default)]
pub struct NoopHeap;

impl Heap for NoopHeap {
    type Node = u32;

    fn for_each_node(&self, _visit: &mut dyn FnMut(u32)) {}
    fn color(&self, _node: u32) -> Color {
        Color::White
    }
    fn try_mark(&self, _node: u32) -> bool {
        true
    }
    fn try_reset_mark(&self, _node: u32) -> bool {
        true
    }
    fn scan_referents(&self, _node: u32, _push: &mut dyn FnMut(u32)) {}
    fn finalize(&self, _node: u32) {}
    fn node_count(&self) -> usize {
        0
    }
}

#[derive(Default)]
pub struct NoopExtraObjects;

impl ExtraObjects for NoopExtraObjects {
    type Entry = u32;

    fn for_each_entry(&self, _visit: &mut dyn FnMut(&u32)) {}
    fn is_marked(&self, _entry: &u32) -> bool {
        true
    }
    fn destroy_unmarked(&self, _entry: &u32) {}
}

pub struct NoopMutator;

impl MutatorRoots for NoopMutator {
    type Node = u32;

    fn publish_tlab(&self) {}
    fn for_each_root(&self, _push: &mut dyn FnMut(u32)) {}
}

#[derive(Default)]
pub struct NoopThreadRegistry;

impl ThreadRegistry for NoopThreadRegistry {
    type Node = u32;
    type Mutator = NoopMutator;

    fn for_each_mutator(&self, _visit: &mut dyn FnMut(&NoopMutator)) {}
}

#[derive(Default)]
pub struct NoopGlobalRoots;

impl GlobalRoots for NoopGlobalRoots {
    type Node = u32;

    fn process_stable_ref_deletions(&self) {}
    fn for_each_global_root(&self, _push: &mut dyn FnMut(u32)) {}
}

#[derive(Default)]
pub struct NoopSuspension;

impl Suspension for NoopSuspension {
    fn request_suspension(&self) -> bool {
        true
    }
    fn wait_for_all_suspended(&self) {}
    fn resume_all(&self) {}
    fn suspend_self_if_requested(&self) {}
}

#[derive(Default)]
pub struct NoopScheduler;

impl GcScheduler for NoopScheduler {
    fn on_safepoint_allocation(&self, _size: usize) {}
    fn on_safepoint_regular(&self, _weight: u32) {}
    fn on_perform_full_gc(&self) {}
    fn on_stopped_for_gc(&self) {}
    fn set_schedule_gc(&self, _callback: Arc<dyn Fn() + Send + Sync>) {}
}

pub struct NoopCollaborators;

impl Collaborators for NoopCollaborators {
    type Node = u32;
    type Heap = NoopHeap;
    type ExtraObjects = NoopExtraObjects;
    type ThreadRegistry = NoopThreadRegistry;
    type GlobalRoots = NoopGlobalRoots;
    type Suspension = NoopSuspension;
    type GcScheduler = NoopScheduler;
}

pub fn new_core() -> Arc<crate::GcCore<NoopCollaborators>> {
    crate::GcCore::new(
        Arc::new(NoopHeap),
        Arc::new(NoopExtraObjects),
        Arc::new(NoopThreadRegistry),
        Arc::new(NoopGlobalRoots),
        Arc::new(NoopSuspension),
        Arc::new(NoopScheduler),
    )
}

//! A small, realistic set of collaborators shared by the scenario tests in this
//! directory. Built only from the crate's public API, the way an embedder would
//! build one — no access to anything private.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use stopgc::vm::{
    Collaborators, Color, ExtraObjects, GcScheduler, GlobalRoots, Heap, MutatorRoots, Suspension,
    ThreadRegistry,
};
use stopgc::GcCore;

pub type Node = u32;

#[derive(Default)]
pub struct GraphHeap {
    inner: Mutex<GraphHeapInner>,
}

#[derive(Default)]
struct GraphHeapInner {
    colors: HashMap<Node, Color>,
    edges: HashMap<Node, Vec<Node>>,
}

impl GraphHeap {
    pub fn insert(&self, node: Node, edges: Vec<Node>) {
        let mut inner = self.inner.lock().unwrap();
        inner.colors.insert(node, Color::White);
        inner.edges.insert(node, edges);
    }

    pub fn contains(&self, node: Node) -> bool {
        self.inner.lock().unwrap().colors.contains_key(&node)
    }

    pub fn live_nodes(&self) -> Vec<Node> {
        let mut v: Vec<_> = self.inner.lock().unwrap().colors.keys().copied().collect();
        v.sort_unstable();
        v
    }
}

impl Heap for GraphHeap {
    type Node = Node;

    fn for_each_node(&self, visit: &mut dyn FnMut(Node)) {
        let nodes: Vec<_> = self.inner.lock().unwrap().colors.keys().copied().collect();
        for n in nodes {
            visit(n);
        }
    }

    fn color(&self, node: Node) -> Color {
        self.inner.lock().unwrap().colors[&node]
    }

    fn try_mark(&self, node: Node) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.colors[&node] == Color::Black {
            false
        } else {
            inner.colors.insert(node, Color::Black);
            true
        }
    }

    fn try_reset_mark(&self, node: Node) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.colors[&node] == Color::White {
            false
        } else {
            inner.colors.insert(node, Color::White);
            true
        }
    }

    fn scan_referents(&self, node: Node, push: &mut dyn FnMut(Node)) {
        let referents = self
            .inner
            .lock()
            .unwrap()
            .edges
            .get(&node)
            .cloned()
            .unwrap_or_default();
        for r in referents {
            push(r);
        }
    }

    fn finalize(&self, node: Node) {
        self.inner.lock().unwrap().colors.remove(&node);
        self.inner.lock().unwrap().edges.remove(&node);
    }

    fn node_count(&self) -> usize {
        self.inner.lock().unwrap().colors.len()
    }
}

#[derive(Default)]
pub struct ExtraTable {
    marked: Mutex<HashMap<u32, bool>>,
    pub destroyed: Mutex<Vec<u32>>,
}

impl ExtraTable {
    /// Register an entry with a base-object liveness bit fixed by the test, as if
    /// an embedder had already resolved it against its own object model.
    pub fn insert(&self, entry: u32, marked: bool) {
        self.marked.lock().unwrap().insert(entry, marked);
    }
}

impl ExtraObjects for ExtraTable {
    type Entry = u32;

    fn for_each_entry(&self, visit: &mut dyn FnMut(&u32)) {
        let keys: Vec<_> = self.marked.lock().unwrap().keys().copied().collect();
        for k in &keys {
            visit(k);
        }
    }

    fn is_marked(&self, entry: &u32) -> bool {
        self.marked.lock().unwrap()[entry]
    }

    fn destroy_unmarked(&self, entry: &u32) {
        self.destroyed.lock().unwrap().push(*entry);
    }
}

pub struct RecordingMutator {
    roots: Mutex<Vec<Node>>,
}

impl RecordingMutator {
    pub fn new(roots: Vec<Node>) -> Self {
        Self {
            roots: Mutex::new(roots),
        }
    }

    pub fn set_roots(&self, roots: Vec<Node>) {
        *self.roots.lock().unwrap() = roots;
    }
}

impl MutatorRoots for RecordingMutator {
    type Node = Node;

    fn publish_tlab(&self) {}

    fn for_each_root(&self, push: &mut dyn FnMut(Node)) {
        for &r in self.roots.lock().unwrap().iter() {
            push(r);
        }
    }
}

#[derive(Default)]
pub struct Registry {
    mutators: Mutex<Vec<Arc<RecordingMutator>>>,
}

impl Registry {
    pub fn register(&self, mutator: Arc<RecordingMutator>) {
        self.mutators.lock().unwrap().push(mutator);
    }
}

impl ThreadRegistry for Registry {
    type Node = Node;
    type Mutator = RecordingMutator;

    fn for_each_mutator(&self, visit: &mut dyn FnMut(&RecordingMutator)) {
        for m in self.mutators.lock().unwrap().iter() {
            visit(m);
        }
    }
}

#[derive(Default)]
pub struct GlobalRootsMock {
    roots: Mutex<Vec<Node>>,
}

impl GlobalRootsMock {
    pub fn set_roots(&self, roots: Vec<Node>) {
        *self.roots.lock().unwrap() = roots;
    }
}

impl GlobalRoots for GlobalRootsMock {
    type Node = Node;

    fn process_stable_ref_deletions(&self) {}

    fn for_each_global_root(&self, push: &mut dyn FnMut(Node)) {
        for &r in self.roots.lock().unwrap().iter() {
            push(r);
        }
    }
}

/// A real barrier-style stop-the-world primitive: `request_suspension` flips a
/// flag, `suspend_self_if_requested` blocks a cooperating mutator thread until
/// `resume_all` is called, and `wait_for_all_suspended` blocks the collector
/// until `expected` mutators have checked in.
pub struct Barrier {
    requested: AtomicBool,
    expected: AtomicUsize,
    suspended: Mutex<usize>,
    cond: Condvar,
}

impl Default for Barrier {
    fn default() -> Self {
        Self {
            requested: AtomicBool::new(false),
            expected: AtomicUsize::new(0),
            suspended: Mutex::new(0),
            cond: Condvar::new(),
        }
    }
}

impl Barrier {
    pub fn set_expected(&self, n: usize) {
        self.expected.store(n, Ordering::SeqCst);
    }
}

impl Suspension for Barrier {
    fn request_suspension(&self) -> bool {
        !self.requested.swap(true, Ordering::SeqCst)
    }

    fn wait_for_all_suspended(&self) {
        let mut guard = self.suspended.lock().unwrap();
        while *guard < self.expected.load(Ordering::SeqCst) {
            guard = self.cond.wait(guard).unwrap();
        }
    }

    fn resume_all(&self) {
        self.requested.store(false, Ordering::SeqCst);
        *self.suspended.lock().unwrap() = 0;
        self.cond.notify_all();
    }

    fn suspend_self_if_requested(&self) {
        if !self.requested.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut guard = self.suspended.lock().unwrap();
            *guard += 1;
            self.cond.notify_all();
        }
        let mut guard = self.suspended.lock().unwrap();
        while self.requested.load(Ordering::SeqCst) {
            guard = self.cond.wait(guard).unwrap();
        }
        let _ = guard;
    }
}

#[derive(Default)]
pub struct SchedulerMock {
    pub allocation_calls: AtomicUsize,
    pub regular_calls: AtomicUsize,
    pub perform_full_gc_calls: AtomicUsize,
    pub stopped_calls: AtomicUsize,
    schedule_gc: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl SchedulerMock {
    pub fn trigger_schedule_gc(&self) {
        if let Some(cb) = self.schedule_gc.lock().unwrap().as_ref() {
            cb();
        }
    }
}

impl GcScheduler for SchedulerMock {
    fn on_safepoint_allocation(&self, _size: usize) {
        self.allocation_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn on_safepoint_regular(&self, _weight: u32) {
        self.regular_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn on_perform_full_gc(&self) {
        self.perform_full_gc_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn on_stopped_for_gc(&self) {
        self.stopped_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn set_schedule_gc(&self, callback: Arc<dyn Fn() + Send + Sync>) {
        *self.schedule_gc.lock().unwrap() = Some(callback);
    }
}

pub struct World;

impl Collaborators for World {
    type Node = Node;
    type Heap = GraphHeap;
    type ExtraObjects = ExtraTable;
    type ThreadRegistry = Registry;
    type GlobalRoots = GlobalRootsMock;
    type Suspension = Barrier;
    type GcScheduler = SchedulerMock;
}

pub struct TestWorld {
    pub core: Arc<GcCore<World>>,
    pub heap: Arc<GraphHeap>,
    pub extra: Arc<ExtraTable>,
    pub registry: Arc<Registry>,
    pub global_roots: Arc<GlobalRootsMock>,
    pub suspension: Arc<Barrier>,
    pub scheduler: Arc<SchedulerMock>,
}

impl TestWorld {
    pub fn new() -> Self {
        let heap = Arc::new(GraphHeap::default());
        let extra = Arc::new(ExtraTable::default());
        let registry = Arc::new(Registry::default());
        let global_roots = Arc::new(GlobalRootsMock::default());
        let suspension = Arc::new(Barrier::default());
        let scheduler = Arc::new(SchedulerMock::default());

        let core = GcCore::<World>::new(
            heap.clone(),
            extra.clone(),
            registry.clone(),
            global_roots.clone(),
            suspension.clone(),
            scheduler.clone(),
        );

        Self {
            core,
            heap,
            extra,
            registry,
            global_roots,
            suspension,
            scheduler,
        }
    }

    /// Register a mutator's root set with the thread registry. This only affects
    /// what `for_each_mutator` enumerates for root collection; it does NOT make
    /// any thread participate in the suspension barrier; call
    /// `suspension.set_expected` separately for that, once per thread that will
    /// actually call into the safepoint protocol.
    pub fn add_mutator(&self, roots: Vec<Node>) -> Arc<RecordingMutator> {
        let mutator = Arc::new(RecordingMutator::new(roots));
        self.registry.register(mutator.clone());
        mutator
    }
}

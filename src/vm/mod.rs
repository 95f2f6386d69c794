//! The trait surface between this crate and the runtime that embeds it.
//!
//! The object factory, root-set enumeration, the thread registry, the suspension
//! primitive and the GC scheduler are all external collaborators, deliberately
//! kept out of this crate's own scope. This module is where that boundary is
//! expressed in Rust: each collaborator is a trait, and an embedder implements
//! exactly the ones it owns. `Collaborators` bundles them into one type parameter
//! so the rest of the crate only has to be generic over a single `C: Collaborators`.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Per-object mark color. White objects have not (yet) been proven reachable this
/// cycle; black objects have. There is no stored gray color — the gray set is a
/// transient work list held only by the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    Black,
}

/// The object factory / heap: iterate nodes, read or flip their color, and scan
/// their referents. This crate never allocates or lays out objects itself; it only
/// asks the heap to do these things on its behalf.
///
/// A "node" is an opaque handle to a heap object — typically a pointer or an index
/// into the factory's own storage. It must be `Copy` because the mark/sweep
/// algorithms push and pop nodes by value on plain `Vec`-backed work lists.
pub trait Heap {
    type Node: Copy + Eq + Hash + Debug + Send + Sync;

    /// Visit every node the factory currently considers live. Must only be called
    /// while every mutator is suspended.
    fn for_each_node(&self, visit: &mut dyn FnMut(Self::Node));

    /// Read a node's current color without mutating it.
    fn color(&self, node: Self::Node) -> Color;

    /// Atomically flip `node` from white to black.
    /// Returns `true` if this call performed the flip (i.e. the node was white),
    /// `false` if the node was already black.
    fn try_mark(&self, node: Self::Node) -> bool;

    /// Atomically flip `node` from black to white, readying it for the next cycle.
    /// Returns `true` if this call performed the flip, `false` if already white.
    fn try_reset_mark(&self, node: Self::Node) -> bool;

    /// Push every node directly reachable from `node` onto `push`.
    fn scan_referents(&self, node: Self::Node, push: &mut dyn FnMut(Self::Node));

    /// Run the user-defined finalizer for `node` and release its storage. Called
    /// by whichever mutator drained the finalizer queue, never by the collector
    /// thread itself.
    fn finalize(&self, node: Self::Node);

    /// Total number of live nodes. Used only for `GcStats` and tests; never
    /// required to be exact under concurrent mutation — only read while the world
    /// is stopped.
    fn node_count(&self) -> usize;
}

/// The extra-object-data side table. Entries with no counterpart in this trait
/// (e.g. how an entry is indexed) are opaque to this crate; it only needs to ask
/// whether an entry's base object survived the mark phase, and to tell the side
/// table to destroy entries that did not.
pub trait ExtraObjects {
    type Entry;

    /// Visit every entry currently tracked by the side table.
    fn for_each_entry(&self, visit: &mut dyn FnMut(&Self::Entry));

    /// Is this entry's base object marked? Objects that do not reside on the GC
    /// heap (e.g. permanent objects) are treated as marked.
    fn is_marked(&self, entry: &Self::Entry) -> bool;

    /// Destroy an entry whose base object was not marked. The side table owns its
    /// own storage and is responsible for actually freeing it.
    fn destroy_unmarked(&self, entry: &Self::Entry);
}

/// One mutator thread's half of the suspension census: publishing its
/// thread-local allocation buffer and yielding its root set.
pub trait MutatorRoots {
    type Node: Copy;

    /// Publish any thread-local allocation buffer into the shared heap so the
    /// marker can see objects this mutator allocated before it was suspended.
    fn publish_tlab(&self);

    /// Push every non-null root this mutator holds (stack slots, thread-locals)
    /// onto `push`.
    fn for_each_root(&self, push: &mut dyn FnMut(Self::Node));
}

/// The thread registry: enumerate every registered mutator while the world is
/// stopped.
pub trait ThreadRegistry {
    type Node: Copy;
    type Mutator: MutatorRoots<Node = Self::Node>;

    /// Visit every registered mutator thread under the registry's lock.
    fn for_each_mutator(&self, visit: &mut dyn FnMut(&Self::Mutator));
}

/// Global roots: globals and the stable-ref registry.
pub trait GlobalRoots {
    type Node: Copy;

    /// Let the stable-ref registry process its pending deletions before it is
    /// enumerated, so dead stable refs are not scanned as roots.
    fn process_stable_ref_deletions(&self);

    /// Push every non-null global root (globals, live stable refs) onto `push`.
    fn for_each_global_root(&self, push: &mut dyn FnMut(Self::Node));
}

/// The cooperative stop-the-world primitive.
pub trait Suspension {
    /// Ask every mutator to suspend at its next safepoint.
    /// Returns `false` if someone else already requested suspension (an expected
    /// denial); the caller must not proceed with a collection.
    fn request_suspension(&self) -> bool;

    /// Block until every registered mutator has actually suspended.
    fn wait_for_all_suspended(&self);

    /// Resume every suspended mutator.
    fn resume_all(&self);

    /// Called by a mutator at its safepoint: block this thread if the collector
    /// has requested a stop.
    fn suspend_self_if_requested(&self);
}

/// The GC scheduler: decides *when* to request a GC based on allocation pressure,
/// and is notified of safepoint and collection events. This crate never calls
/// `request_gc` directly; it only registers a `schedule_gc` callback that the
/// scheduler invokes when it decides a GC is warranted.
pub trait GcScheduler {
    /// Called from the allocation safepoint entry point with the allocated size.
    fn on_safepoint_allocation(&self, size: usize);

    /// Called from the prologue/loop-body safepoint entry points with an opaque
    /// weight (see `W_PROLOGUE`/`W_LOOP`) used for time-based sampling.
    fn on_safepoint_regular(&self, weight: u32);

    /// Called once at the start of `Collector::perform_full_gc`.
    fn on_perform_full_gc(&self);

    /// Called once per mutator thread after it has been confirmed stopped.
    fn on_stopped_for_gc(&self);

    /// Register the callback the scheduler should invoke when it decides a GC
    /// should be requested. The callback attempts `StateCell::compare_and_swap`
    /// from `Phase::None` to `Phase::NeedsGc`; the scheduler is free to call it
    /// any number of times from any thread.
    fn set_schedule_gc(&self, callback: Arc<dyn Fn() + Send + Sync>);
}

/// Bundles every external collaborator into a single type parameter so the rest
/// of the crate is generic over one `C` instead of five.
pub trait Collaborators: Sized + 'static {
    type Node: Copy + Eq + Hash + Debug + Send + Sync;
    type Heap: Heap<Node = Self::Node>;
    type ExtraObjects: ExtraObjects;
    type ThreadRegistry: ThreadRegistry<Node = Self::Node>;
    type GlobalRoots: GlobalRoots<Node = Self::Node>;
    type Suspension: Suspension;
    type GcScheduler: GcScheduler;
}

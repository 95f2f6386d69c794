//! A stop-the-world, non-moving, precise mark-and-sweep garbage collector core.
//!
//! This crate implements the state machine, safepoint protocol, collection
//! cycle, and finalizer hand-off of a mark-and-sweep collector. It does not
//! allocate, lay out, or scan objects itself — those responsibilities, along
//! with the thread registry and the stop-the-world primitive, are external
//! collaborators an embedder implements against the traits in [`vm`].
//!
//! An embedder typically:
//! 1. Implements [`vm::Heap`], [`vm::ExtraObjects`], [`vm::MutatorRoots`],
//!    [`vm::ThreadRegistry`], [`vm::GlobalRoots`], [`vm::Suspension`], and
//!    [`vm::GcScheduler`] against its own object model, thread registry and
//!    stop-the-world mechanism.
//! 2. Bundles them into one type implementing [`vm::Collaborators`].
//! 3. Constructs a [`GcCore`] once per heap.
//! 4. Gives each mutator thread a [`SafepointProtocol`] (via
//!    [`GcCore::new_safepoint`]) and calls `prologue`/`loop_body`/`allocation`
//!    from generated code at the corresponding points, and `on_oom` when an
//!    allocation cannot be satisfied.

#[cfg(feature = "test_private")]
pub mod bench_support;
mod collector;
mod error;
mod facade;
mod finalizer;
mod mark;
mod safepoint;
mod state;
mod sweep;
pub mod util;
pub mod vm;

pub use collector::GcStats;
pub use facade::GcCore;
pub use safepoint::{SafepointProtocol, W_LOOP, W_PROLOGUE};
pub use state::Phase;

//! Sweep of the extra-object-data side table and the main heap.

use crate::vm::{Color, ExtraObjects, Heap};

/// Iterate the extra-object-data side table and destroy every entry whose base
/// object was not marked. The side table owns destruction; this function only
/// decides which entries qualify.
pub fn sweep_extra_objects<E: ExtraObjects>(extra: &E) {
    extra.for_each_entry(&mut |entry| {
        if !extra.is_marked(entry) {
            extra.destroy_unmarked(entry);
        }
    });
}

/// Iterate every node in the main heap. White nodes are appended to
/// `finalizer_queue` (the collector transfers ownership into `FinalizerQueue`
/// immediately after this call returns). Black nodes are reset to white for the
/// next cycle. Mark/reset is a single atomic field flip with no contention, since
/// the world is stopped while this runs.
pub fn sweep_main_heap<H: Heap>(heap: &H, finalizer_queue: &mut Vec<H::Node>) {
    heap.for_each_node(&mut |node| match heap.color(node) {
        Color::White => finalizer_queue.push(node),
        Color::Black => {
            heap.try_reset_mark(node);
        }
    });
}

//! Total ordering of worker metrics by descending resident memory.
//!
//! Comparisons use `Ord` on `u64` directly rather than subtracting one memory
//! value from another, so there is no risk of the underflow a naive
//! `a - b < 0` check would invite.

use crate::metrics::WorkerProcessMetrics;
use std::cmp::Ordering;

/// Compares two metrics by resident memory, descending (largest first).
pub fn descending_by_memory(a: &WorkerProcessMetrics, b: &WorkerProcessMetrics) -> Ordering {
    b.resident_memory_kib.cmp(&a.resident_memory_kib)
}

/// Sorts `metrics` by descending resident memory in place.
///
/// Stable: metrics with equal memory keep their relative input order, which
/// is the tie-break rule `spec.md` §4.2 Step C calls for.
pub fn sort_descending(metrics: &mut [WorkerProcessMetrics]) {
    metrics.sort_by(descending_by_memory);
}

/// Returns a vector of references to `metrics`, sorted by descending resident
/// memory, without mutating or cloning the input.
pub fn ordered_refs(metrics: &[WorkerProcessMetrics]) -> Vec<&WorkerProcessMetrics> {
    let mut refs: Vec<&WorkerProcessMetrics> = metrics.iter().collect();
    refs.sort_by(|a, b| descending_by_memory(a, b));
    refs
}

//! The candidate-selection pure function shared by fleet-cap eviction (§4.2
//! Step C) and the shrink pass (§4.2 Step E).
//!
//! Given a set of metrics, a memory cap, and the current aggregate usage,
//! [`select`] returns the smallest largest-first prefix whose removal would
//! bring usage at or below the cap — or the full input if no prefix
//! achieves compliance. It does not know or care whether its input was
//! filtered to idle workers; that filtering is the caller's job (§4.2 Step B
//! for the fleet pass, no filter at all for the shrink pass).

use crate::memory_order::ordered_refs;
use crate::metrics::WorkerProcessMetrics;

/// Selects the minimal largest-first prefix of `metrics` whose removal brings
/// `used_mb` at or below `cap_mb`.
///
/// - Returns an empty vector if `metrics` is empty or `used_mb <= cap_mb`
///   already (nothing to do).
/// - Otherwise returns at least one element, and returns the full input if no
///   prefix achieves `used_mb - freed <= cap_mb` (active workers alone
///   exceed the cap; the tick will not achieve compliance, which `spec.md`
///   accepts rather than treats as an error).
///
/// Deterministic given a stable sort and stable input ordering: ties break by
/// input order, per [`crate::memory_order`].
pub fn select<'a>(
    metrics: &'a [WorkerProcessMetrics],
    cap_mb: u64,
    used_mb: u64,
) -> Vec<&'a WorkerProcessMetrics> {
    if metrics.is_empty() || used_mb <= cap_mb {
        return Vec::new();
    }

    let ordered = ordered_refs(metrics);
    let mut freed: u64 = 0;
    let mut chosen = Vec::new();

    for m in ordered {
        if used_mb.saturating_sub(freed) <= cap_mb {
            break;
        }
        chosen.push(m);
        freed += m.memory_mb();
    }

    chosen
}

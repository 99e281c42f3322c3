//! Per-worker-cap killing (§4.3): the direct OS-process path, bypassing the
//! pool entirely.
//!
//! A worker whose resident memory exceeds `workerMemoryLimitMb` is considered
//! malfunctioning. This path does not coordinate with the pool's idle/busy
//! view — it kills the process directly and lets the pool discover the death
//! the next time it tries to use the worker.

use crate::events::{EventBus, WorkerEvictedEvent};
use crate::metrics::WorkerProcessMetrics;
use crate::reporting::Reporting;
use crate::status::StatusValue;

/// A handle to a live OS process, capable of being forcibly terminated.
pub trait ProcessHandle: Send + Sync {
    fn forcibly_terminate(&self);
}

/// Resolves a pid to a [`ProcessHandle`], or `None` if the process is already
/// gone (§7: a transient observation gap, skipped this tick and retried
/// next).
pub trait ProcessLookup: Send + Sync {
    fn lookup(&self, pid: u32) -> Option<Box<dyn ProcessHandle>>;
}

/// Kills every worker process whose resident memory exceeds `cap_mb`,
/// transitions its [`crate::status::Status`] to
/// [`StatusValue::KilledDueToMemoryPressure`], and returns one
/// [`WorkerEvictedEvent`] per logical worker id on processes that were
/// actually transitioned.
///
/// Implements §4.3 steps 1-4. The per-worker-cap warning is always reported
/// regardless of the `workerVerbose` setting, because a breach here may cause
/// an in-flight action to fail.
pub fn kill_over_limit(
    metrics: &[WorkerProcessMetrics],
    cap_mb: u64,
    lookup: &dyn ProcessLookup,
    reporting: &Reporting,
    event_bus: Option<&dyn EventBus>,
) -> Vec<WorkerEvictedEvent> {
    let mut events = Vec::new();

    for m in metrics {
        if m.memory_mb() <= cap_mb {
            continue;
        }

        let Some(handle) = lookup.lookup(m.pid) else {
            tracing::debug!(pid = m.pid, "per-worker cap breach but process already gone, skipping");
            continue;
        };

        reporting.warn_always(&format!(
            "worker process {} (pid {}, mnemonic {}) exceeded the per-worker memory limit of {} MB (using {} MB) and is being killed",
            m.worker_key_hash, m.pid, m.mnemonic, cap_mb, m.memory_mb()
        ));
        tracing::warn!(
            pid = m.pid,
            mnemonic = %m.mnemonic,
            memory_mb = m.memory_mb(),
            cap_mb,
            "killing worker process over per-worker memory cap"
        );

        handle.forcibly_terminate();

        if m.status.maybe_update(StatusValue::KilledDueToMemoryPressure) {
            for &worker_id in &m.worker_ids {
                let event = WorkerEvictedEvent {
                    worker_id,
                    worker_key_hash: m.worker_key_hash.clone(),
                    mnemonic: m.mnemonic.clone(),
                };
                if let Some(bus) = event_bus {
                    bus.post(event.clone());
                }
                events.push(event);
            }
        }
    }

    events
}

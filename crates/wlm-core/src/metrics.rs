//! The read-only worker-process snapshot the WLM reasons about each tick.
//!
//! [`WorkerProcessMetrics`] identifies a worker *process*, which may
//! multiplex several logical worker ids (distinct checkout tokens sharing one
//! OS process). Metrics are sampled fresh each tick by a [`MetricsCollector`]
//! and never retained across ticks; [`Status`] is the one piece of state that
//! *does* survive across ticks, for the worker process's lifetime.

use crate::status::Status;

/// A logical worker checkout token. Several of these may share one OS process.
pub type WorkerId = u64;

/// A read-only snapshot of one worker process's resource usage and identity.
#[derive(Debug, Clone)]
pub struct WorkerProcessMetrics {
    /// OS process id.
    pub pid: u32,
    /// Stable identity for the worker's class/configuration.
    pub worker_key_hash: String,
    /// Human-readable class tag, e.g. `"Javac"`.
    pub mnemonic: String,
    /// Logical worker ids currently bound to this process.
    pub worker_ids: Vec<WorkerId>,
    /// Current resident memory, in KiB.
    pub resident_memory_kib: u64,
    /// Shared handle to this process's status; mutated by the WLM and by the
    /// pool's return-to-pool path.
    pub status: Status,
}

impl WorkerProcessMetrics {
    /// Resident memory in whole megabytes, truncated (not rounded).
    ///
    /// This truncation is deliberate and spec-locked: a worker at 1999 KiB
    /// reports as 1 MB, the same as one at 1001 KiB. Implementations must
    /// preserve this behavior rather than round, to keep aggregate-usage
    /// arithmetic stable across the fleet-cap pipeline.
    pub fn memory_mb(&self) -> u64 {
        self.resident_memory_kib / 1000
    }
}

/// Supplies a fresh snapshot of all currently-live worker processes.
///
/// Implementations must be safe to call from the control-loop thread once per
/// tick and must reflect currently-live processes; the WLM treats the
/// returned list as immutable once received.
pub trait MetricsCollector: Send + Sync {
    fn live_metrics(&self) -> Vec<WorkerProcessMetrics>;
}

/// Sums truncated per-worker megabytes across a metrics snapshot.
///
/// Matches `U = Σ floor(kib/1000)`: the division happens per worker *before*
/// the sum, so this is not the same value as `floor(Σ kib / 1000)`.
pub fn aggregate_usage_mb(metrics: &[WorkerProcessMetrics]) -> u64 {
    metrics.iter().map(WorkerProcessMetrics::memory_mb).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(kib: u64) -> WorkerProcessMetrics {
        WorkerProcessMetrics {
            pid: 1,
            worker_key_hash: "hash".to_string(),
            mnemonic: "Javac".to_string(),
            worker_ids: vec![1],
            resident_memory_kib: kib,
            status: Status::new(),
        }
    }

    #[test]
    fn test_memory_mb_truncates() {
        assert_eq!(metric(1999).memory_mb(), 1);
        assert_eq!(metric(1001).memory_mb(), 1);
        assert_eq!(metric(2000).memory_mb(), 2);
        assert_eq!(metric(999).memory_mb(), 0);
    }

    #[test]
    fn test_aggregate_usage_sums_per_worker_truncation() {
        // Two workers at 1999 KiB each truncate to 1 MB each -> sum 2,
        // not floor(3998/1000) = 3.
        let metrics = vec![metric(1999), metric(1999)];
        assert_eq!(aggregate_usage_mb(&metrics), 2);
    }

    #[test]
    fn test_aggregate_usage_empty_is_zero() {
        assert_eq!(aggregate_usage_mb(&[]), 0);
    }
}

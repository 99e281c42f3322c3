//! Reference implementations of the collaborator traits from §6.
//!
//! None of these implement the *external* worker pool, metrics collector, or
//! process table (§1 explicitly keeps those out of scope) — they are
//! in-memory stand-ins so the crate's own tests and `wlm-cli`'s demo mode can
//! exercise a real [`ControlLoop`](crate::control_loop::ControlLoop) end to
//! end. The pool is generalized from the teacher crate's fixed-size
//! `Mutex`-guarded interpreter pool (`pool.rs`) into a keyed, idle/busy
//! object pool.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::WlmError;
use crate::events::{EventBus, WorkerEvictedEvent};
use crate::killer::{ProcessHandle, ProcessLookup};
use crate::metrics::{MetricsCollector, WorkerId, WorkerProcessMetrics};
use crate::pool::{IdleWorker, SweepVerdict, WorkerPool};
use crate::reporting::Reporter;
use crate::status::Status;

// ── In-memory worker pool ────────────────────────────────────────────────────

struct SubPool {
    idle: Vec<(WorkerId, Status)>,
    checked_out: HashMap<WorkerId, Status>,
}

impl SubPool {
    fn new() -> Self {
        SubPool {
            idle: Vec::new(),
            checked_out: HashMap::new(),
        }
    }
}

/// A keyed (sub-pool per mnemonic/configuration key) idle/busy object pool.
///
/// Mirrors the teacher's `Mutex`-guarded slot pool: the whole map is locked
/// for the duration of a sweep, which is exactly the "serialize visits so a
/// worker cannot be checked out mid-sweep" contract `WorkerPool` requires.
pub struct InMemoryWorkerPool {
    sub_pools: Mutex<HashMap<String, SubPool>>,
}

impl InMemoryWorkerPool {
    pub fn new() -> Self {
        InMemoryWorkerPool {
            sub_pools: Mutex::new(HashMap::new()),
        }
    }

    /// Parks a worker id as idle under `key`.
    pub fn park_idle(&self, key: &str, worker_id: WorkerId, status: Status) {
        let mut pools = self.sub_pools.lock().expect("pool lock poisoned");
        pools
            .entry(key.to_string())
            .or_insert_with(SubPool::new)
            .idle
            .push((worker_id, status));
    }

    /// Marks a worker id as checked out (busy) under `key`.
    pub fn check_out(&self, key: &str, worker_id: WorkerId, status: Status) {
        let mut pools = self.sub_pools.lock().expect("pool lock poisoned");
        pools
            .entry(key.to_string())
            .or_insert_with(SubPool::new)
            .checked_out
            .insert(worker_id, status);
    }

    /// Returns a checked-out worker to the pool. If its status has been
    /// tagged `PendingKillDueToMemoryPressure` (or worse) in the meantime,
    /// the pool destroys it instead of parking it idle, per §3's Status
    /// contract. Returns `true` if destroyed, `false` if parked idle.
    pub fn return_to_pool(&self, key: &str, worker_id: WorkerId) -> bool {
        let mut pools = self.sub_pools.lock().expect("pool lock poisoned");
        let Some(sub) = pools.get_mut(key) else {
            return false;
        };
        let Some(status) = sub.checked_out.remove(&worker_id) else {
            return false;
        };
        if status.current() >= crate::status::StatusValue::PendingKillDueToMemoryPressure {
            true
        } else {
            sub.idle.push((worker_id, status));
            false
        }
    }

    /// All currently-idle worker ids, across every sub-pool.
    pub fn idle_ids(&self) -> HashSet<WorkerId> {
        let pools = self.sub_pools.lock().expect("pool lock poisoned");
        pools
            .values()
            .flat_map(|sub| sub.idle.iter().map(|(id, _)| *id))
            .collect()
    }
}

impl Default for InMemoryWorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerPool for InMemoryWorkerPool {
    fn evict_with_policy(
        &self,
        policy: &mut dyn FnMut(&IdleWorker) -> SweepVerdict,
    ) -> Result<HashSet<WorkerId>, WlmError> {
        let mut pools = self.sub_pools.lock().expect("pool lock poisoned");
        let mut destroyed = HashSet::new();

        for sub in pools.values_mut() {
            let mut kept = Vec::with_capacity(sub.idle.len());
            for (worker_id, status) in sub.idle.drain(..) {
                let handle = IdleWorker {
                    worker_id,
                    status: status.clone(),
                };
                match policy(&handle) {
                    SweepVerdict::Keep => kept.push((worker_id, status)),
                    SweepVerdict::Destroy => {
                        destroyed.insert(worker_id);
                    }
                }
            }
            sub.idle = kept;
        }

        Ok(destroyed)
    }
}

// ── Metrics collector ────────────────────────────────────────────────────────

/// A metrics collector returning a fixed, settable snapshot.
pub struct FakeMetricsCollector {
    metrics: Mutex<Vec<WorkerProcessMetrics>>,
}

impl FakeMetricsCollector {
    pub fn new(metrics: Vec<WorkerProcessMetrics>) -> Self {
        FakeMetricsCollector {
            metrics: Mutex::new(metrics),
        }
    }

    pub fn set(&self, metrics: Vec<WorkerProcessMetrics>) {
        *self.metrics.lock().expect("metrics lock poisoned") = metrics;
    }
}

impl MetricsCollector for FakeMetricsCollector {
    fn live_metrics(&self) -> Vec<WorkerProcessMetrics> {
        self.metrics.lock().expect("metrics lock poisoned").clone()
    }
}

// ── Process lookup / handle ─────────────────────────────────────────────────

/// A process table covering a fixed set of resolvable pids, recording which
/// ones were asked to terminate.
pub struct FakeProcessLookup {
    resolvable: HashSet<u32>,
    terminated: Arc<Mutex<HashSet<u32>>>,
}

impl FakeProcessLookup {
    pub fn new(resolvable_pids: Vec<u32>) -> Self {
        FakeProcessLookup {
            resolvable: resolvable_pids.into_iter().collect(),
            terminated: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn was_terminated(&self, pid: u32) -> bool {
        self.terminated.lock().expect("terminated lock poisoned").contains(&pid)
    }
}

impl ProcessLookup for FakeProcessLookup {
    fn lookup(&self, pid: u32) -> Option<Box<dyn ProcessHandle>> {
        if !self.resolvable.contains(&pid) {
            return None;
        }
        Some(Box::new(FakeProcessHandle {
            pid,
            terminated: Arc::clone(&self.terminated),
        }))
    }
}

struct FakeProcessHandle {
    pid: u32,
    terminated: Arc<Mutex<HashSet<u32>>>,
}

impl ProcessHandle for FakeProcessHandle {
    fn forcibly_terminate(&self) {
        self.terminated
            .lock()
            .expect("terminated lock poisoned")
            .insert(self.pid);
    }
}

// ── Reporter ─────────────────────────────────────────────────────────────────

/// A [`Reporter`] that records call counts and messages for assertions.
pub struct FakeReporter {
    info_count: AtomicUsize,
    warn_count: AtomicUsize,
    messages: Mutex<Vec<String>>,
}

impl FakeReporter {
    pub fn new() -> Self {
        FakeReporter {
            info_count: AtomicUsize::new(0),
            warn_count: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn info_count(&self) -> usize {
        self.info_count.load(Ordering::SeqCst)
    }

    pub fn warn_count(&self) -> usize {
        self.warn_count.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("messages lock poisoned").clone()
    }
}

impl Default for FakeReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for FakeReporter {
    fn info(&self, message: &str) {
        self.info_count.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().expect("messages lock poisoned").push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warn_count.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().expect("messages lock poisoned").push(message.to_string());
    }
}

// ── Event bus ────────────────────────────────────────────────────────────────

/// An [`EventBus`] that records every posted event.
pub struct FakeEventBus {
    posted: Mutex<Vec<WorkerEvictedEvent>>,
}

impl FakeEventBus {
    pub fn new() -> Self {
        FakeEventBus {
            posted: Mutex::new(Vec::new()),
        }
    }

    pub fn posted_count(&self) -> usize {
        self.posted.lock().expect("posted lock poisoned").len()
    }

    pub fn posted(&self) -> Vec<WorkerEvictedEvent> {
        self.posted.lock().expect("posted lock poisoned").clone()
    }
}

impl Default for FakeEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for FakeEventBus {
    fn post(&self, event: WorkerEvictedEvent) {
        self.posted.lock().expect("posted lock poisoned").push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusValue;

    #[test]
    fn test_return_to_pool_parks_idle_when_still_alive() {
        let pool = InMemoryWorkerPool::new();
        let status = Status::new();
        pool.check_out("k1", 1, status);

        let destroyed = pool.return_to_pool("k1", 1);
        assert!(!destroyed);
        assert_eq!(pool.idle_ids(), HashSet::from([1]));
    }

    #[test]
    fn test_return_to_pool_destroys_when_pending_kill() {
        let pool = InMemoryWorkerPool::new();
        let status = Status::new();
        status.maybe_update(StatusValue::PendingKillDueToMemoryPressure);
        pool.check_out("k1", 1, status);

        let destroyed = pool.return_to_pool("k1", 1);
        assert!(destroyed);
        assert!(pool.idle_ids().is_empty());
    }

    #[test]
    fn test_fake_process_lookup_tracks_termination() {
        let lookup = FakeProcessLookup::new(vec![10, 20]);
        assert!(lookup.lookup(99).is_none());
        let handle = lookup.lookup(10).expect("pid 10 resolvable");
        handle.forcibly_terminate();
        assert!(lookup.was_terminated(10));
        assert!(!lookup.was_terminated(20));
    }
}

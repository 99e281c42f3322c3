//! Real, non-testkit implementations of [`MetricsCollector`] and
//! [`ProcessLookup`] backed by `sysinfo`.
//!
//! Grounded on `golem-worker-executor-base`'s own use of `sysinfo` for
//! resident-memory sampling (`tests/measure_test_component_mem.rs`):
//! `System::new_all()`, `refresh_process(pid)`, and `process.memory()`.
//!
//! The worker pool itself is out of scope (§1), so this collector only knows
//! about pids the caller has explicitly [`register`](SysinfoMetricsCollector::register)ed
//! as belonging to a worker process; it never discovers worker processes on
//! its own.

use std::collections::HashMap;
use std::sync::Mutex;

use sysinfo::{Pid, System};

use crate::killer::{ProcessHandle, ProcessLookup};
use crate::metrics::{MetricsCollector, WorkerId, WorkerProcessMetrics};
use crate::status::Status;

/// The identity the pool associates with a worker process, registered once
/// when the process is created and deregistered once it exits.
#[derive(Debug, Clone)]
pub struct RegisteredWorker {
    pub pid: u32,
    pub worker_key_hash: String,
    pub mnemonic: String,
    pub worker_ids: Vec<WorkerId>,
    pub status: Status,
}

/// Samples resident memory for a set of externally-registered worker pids.
pub struct SysinfoMetricsCollector {
    registry: Mutex<HashMap<u32, RegisteredWorker>>,
}

impl SysinfoMetricsCollector {
    pub fn new() -> Self {
        SysinfoMetricsCollector {
            registry: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, worker: RegisteredWorker) {
        self.registry
            .lock()
            .expect("registry lock poisoned")
            .insert(worker.pid, worker);
    }

    pub fn deregister(&self, pid: u32) {
        self.registry.lock().expect("registry lock poisoned").remove(&pid);
    }
}

impl Default for SysinfoMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector for SysinfoMetricsCollector {
    fn live_metrics(&self) -> Vec<WorkerProcessMetrics> {
        let registry = self.registry.lock().expect("registry lock poisoned");
        let mut system = System::new();
        let mut out = Vec::with_capacity(registry.len());

        for worker in registry.values() {
            let pid = Pid::from_u32(worker.pid);
            system.refresh_process(pid);
            let Some(process) = system.process(pid) else {
                // Process already exited; the next registry sweep by the
                // owning pool will deregister it. Skip for this tick.
                continue;
            };
            out.push(WorkerProcessMetrics {
                pid: worker.pid,
                worker_key_hash: worker.worker_key_hash.clone(),
                mnemonic: worker.mnemonic.clone(),
                worker_ids: worker.worker_ids.clone(),
                resident_memory_kib: process.memory() / 1024,
                status: worker.status.clone(),
            });
        }

        out
    }
}

/// Resolves pids against the live system process table.
pub struct SysinfoProcessLookup;

impl SysinfoProcessLookup {
    pub fn new() -> Self {
        SysinfoProcessLookup
    }
}

impl Default for SysinfoProcessLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLookup for SysinfoProcessLookup {
    fn lookup(&self, pid: u32) -> Option<Box<dyn ProcessHandle>> {
        let mut system = System::new();
        let sys_pid = Pid::from_u32(pid);
        system.refresh_process(sys_pid);
        system
            .process(sys_pid)
            .map(|_| Box::new(SysinfoProcessHandle { pid: sys_pid }) as Box<dyn ProcessHandle>)
    }
}

struct SysinfoProcessHandle {
    pid: Pid,
}

impl ProcessHandle for SysinfoProcessHandle {
    fn forcibly_terminate(&self) {
        let mut system = System::new();
        system.refresh_process(self.pid);
        if let Some(process) = system.process(self.pid) {
            process.kill();
        }
    }
}

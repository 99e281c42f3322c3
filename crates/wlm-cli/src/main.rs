//! Dry-run preview for the worker lifecycle manager.
//!
//! Reads a JSON snapshot of worker processes (from `--file` or stdin),
//! builds an in-memory pool from it, runs one fleet-cap eviction pass and one
//! per-worker-cap kill pass against the configured (or overridden) limits,
//! and prints the resulting events as JSON. Nothing here touches a real
//! process or a real pool -- both are out of scope for the crate itself --
//! so this is safe to point at a captured snapshot to sanity-check a
//! `wlm.toml` before deploying it.

use std::io::{self, Read};

use clap::Parser;
use serde::{Deserialize, Serialize};

use wlm_core::control_loop::run_fleet_cap_pipeline;
use wlm_core::killer::kill_over_limit;
use wlm_core::reporting::Reporting;
use wlm_core::status::Status;
use wlm_core::testkit::{FakeEventBus, FakeProcessLookup, InMemoryWorkerPool};
use wlm_core::{WorkerEvictedEvent, WorkerLifecycleConfig, WorkerProcessMetrics};

#[derive(Parser, Debug)]
#[command(name = "wlm-cli", about = "Preview worker lifecycle manager decisions against a captured snapshot")]
struct Args {
    /// Path to a JSON snapshot; reads stdin if omitted.
    #[arg(long)]
    file: Option<std::path::PathBuf>,

    /// Overrides total_worker_memory_limit_mb from config.
    #[arg(long)]
    fleet_cap_mb: Option<u64>,

    /// Overrides worker_memory_limit_mb from config.
    #[arg(long)]
    worker_cap_mb: Option<u64>,

    /// Overrides shrink_worker_pool from config.
    #[arg(long)]
    shrink: bool,
}

#[derive(Debug, Deserialize)]
struct SnapshotWorker {
    pid: u32,
    worker_key_hash: String,
    mnemonic: String,
    worker_ids: Vec<u64>,
    resident_memory_kib: u64,
    /// Whether this worker is currently idle in the pool (vs. checked out).
    idle: bool,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    workers: Vec<SnapshotWorker>,
}

#[derive(Debug, Serialize)]
struct PreviewResult {
    fleet_cap_mb: u64,
    worker_cap_mb: u64,
    fleet_eviction_events: Vec<WorkerEvictedEvent>,
    per_worker_kill_events: Vec<WorkerEvictedEvent>,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let input = if let Some(path) = &args.file {
        std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Error reading file: {e}");
            std::process::exit(1);
        })
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).unwrap_or_else(|e| {
            eprintln!("Error reading stdin: {e}");
            std::process::exit(1);
        });
        buf
    };
    let snapshot: Snapshot = serde_json::from_str(&input).unwrap_or_else(|e| {
        eprintln!("Invalid snapshot JSON: {e}");
        std::process::exit(1);
    });

    let mut config = WorkerLifecycleConfig::load().unwrap_or_default();
    if let Some(cap) = args.fleet_cap_mb {
        config.total_worker_memory_limit_mb = cap;
    }
    if let Some(cap) = args.worker_cap_mb {
        config.worker_memory_limit_mb = cap;
    }
    if args.shrink {
        config.shrink_worker_pool = true;
    }

    let pool = InMemoryWorkerPool::new();
    let mut metrics = Vec::with_capacity(snapshot.workers.len());
    let mut resolvable_pids = Vec::with_capacity(snapshot.workers.len());

    for worker in &snapshot.workers {
        let status = Status::new();
        for &id in &worker.worker_ids {
            if worker.idle {
                pool.park_idle(&worker.mnemonic, id, status.clone());
            } else {
                pool.check_out(&worker.mnemonic, id, status.clone());
            }
        }
        resolvable_pids.push(worker.pid);
        metrics.push(WorkerProcessMetrics {
            pid: worker.pid,
            worker_key_hash: worker.worker_key_hash.clone(),
            mnemonic: worker.mnemonic.clone(),
            worker_ids: worker.worker_ids.clone(),
            resident_memory_kib: worker.resident_memory_kib,
            status,
        });
    }

    let reporting = Reporting::new(None, config.worker_verbose);
    let bus = FakeEventBus::new();
    let lookup = FakeProcessLookup::new(resolvable_pids);

    let mut fleet_events = Vec::new();
    if config.total_worker_memory_limit_mb > 0 {
        fleet_events = run_fleet_cap_pipeline(
            &pool,
            &metrics,
            config.total_worker_memory_limit_mb,
            config.shrink_worker_pool,
            &reporting,
            Some(&bus),
        )
        .unwrap_or_else(|e| {
            eprintln!("fleet-cap pipeline failed: {e}");
            std::process::exit(1);
        });
    }

    let mut per_worker_events = Vec::new();
    if config.worker_memory_limit_mb > 0 {
        per_worker_events = kill_over_limit(
            &metrics,
            config.worker_memory_limit_mb,
            &lookup,
            &reporting,
            Some(&bus),
        );
    }

    let result = PreviewResult {
        fleet_cap_mb: config.total_worker_memory_limit_mb,
        worker_cap_mb: config.worker_memory_limit_mb,
        fleet_eviction_events: fleet_events,
        per_worker_kill_events: per_worker_events,
    };

    let json = serde_json::to_string(&result).expect("PreviewResult is always serializable");
    println!("{json}");
    // Exit 0 always — the dry run always completes; a bad config merely
    // produces an empty events list, and a bad snapshot exits early above.
}

//! The periodic driver (§4.1): sample metrics, run the fleet-cap pipeline,
//! run per-worker-cap killing, sleep, repeat — until `stop()` is called.
//!
//! Runs on one dedicated background thread, following the teacher crate's
//! `thread::Builder::new().name(..).spawn(..)` convention (`pool.rs`). Sleep
//! is implemented with a `Condvar` rather than `thread::sleep` so `stop()`
//! can wake the loop immediately instead of waiting out the remainder of the
//! poll interval — matching §5's "both sleep and sweeps must be
//! interruptible; interruption is interpreted as shutdown".

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::WorkerLifecycleConfig;
use crate::error::WlmError;
use crate::events::{EventBus, WorkerEvictedEvent};
use crate::killer::{kill_over_limit, ProcessLookup};
use crate::metrics::{aggregate_usage_mb, MetricsCollector, WorkerId, WorkerProcessMetrics};
use crate::pool::{PoolSweep, WorkerPool};
use crate::reporting::{Reporter, Reporting};
use crate::selector::select;
use crate::status::StatusValue;

/// Runs the fleet-cap eviction pipeline (§4.2 Steps A-F) once, against a
/// single metrics snapshot. Free-standing and pure-ish (its only side
/// effects are the pool sweep, `Status` tagging, reporting, and event
/// publication) so it is directly testable without a running control-loop
/// thread.
pub fn run_fleet_cap_pipeline(
    pool: &dyn WorkerPool,
    metrics: &[WorkerProcessMetrics],
    cap_mb: u64,
    shrink: bool,
    reporting: &Reporting,
    event_bus: Option<&dyn EventBus>,
) -> Result<Vec<WorkerEvictedEvent>, WlmError> {
    let used_mb = aggregate_usage_mb(metrics);
    if used_mb <= cap_mb {
        return Ok(Vec::new());
    }

    // Step A: which ids are currently idle, per the pool's own iteration.
    let idle_ids = PoolSweep::inspect(pool)?;

    // Step B: a metric is eligible if any of its logical ids is idle.
    let eligible: Vec<WorkerProcessMetrics> = metrics
        .iter()
        .filter(|m| m.worker_ids.iter().any(|id| idle_ids.contains(id)))
        .cloned()
        .collect();

    // Step C: largest-first minimal prefix among eligible metrics.
    let chosen = select(&eligible, cap_mb, used_mb);
    reporting.report_candidate_search(chosen.is_empty());
    if chosen.is_empty() {
        return Ok(Vec::new());
    }

    let candidate_ids: HashSet<WorkerId> = chosen
        .iter()
        .flat_map(|m| m.worker_ids.iter().copied())
        .collect();

    // Step D: destructive sweep; escapees (checked out between A and D)
    // simply do not appear in `destroyed_ids`.
    let destroyed_ids = PoolSweep::destructive(pool, &candidate_ids)?;

    let mut events = Vec::new();
    for m in metrics {
        for &id in &m.worker_ids {
            if destroyed_ids.contains(&id) {
                events.push(WorkerEvictedEvent {
                    worker_id: id,
                    worker_key_hash: m.worker_key_hash.clone(),
                    mnemonic: m.mnemonic.clone(),
                });
            }
        }
    }

    // Step E: recompute usage over what's left after the destructive sweep.
    // This report must fire whenever the tick could not bring usage under
    // budget (§7 "over-budget but uncorrectable" / §8 scenario S3), not just
    // when `shrink` is enabled — the shrink pass only adds the deferred-kill
    // marking on top of the same over-budget check.
    let not_evicted: Vec<WorkerProcessMetrics> = metrics
        .iter()
        .filter(|m| !m.worker_ids.iter().any(|id| destroyed_ids.contains(id)))
        .cloned()
        .collect();
    let remaining_used = aggregate_usage_mb(&not_evicted);
    if remaining_used > cap_mb {
        tracing::warn!(
            remaining_used_mb = remaining_used,
            cap_mb,
            "fleet usage still over budget after eviction; could not bring under budget this tick"
        );
        reporting.info_if_verbose(&format!(
            "fleet usage still {remaining_used} MB over the {cap_mb} MB budget after eviction"
        ));
        if shrink {
            for m in select(&not_evicted, cap_mb, remaining_used) {
                m.status.maybe_update(StatusValue::PendingKillDueToMemoryPressure);
            }
        }
    }

    // Step F: publish.
    for event in &events {
        if let Some(bus) = event_bus {
            bus.post(event.clone());
        }
    }

    Ok(events)
}

/// The periodic control-loop driver.
pub struct ControlLoop {
    config: WorkerLifecycleConfig,
    collector: Arc<dyn MetricsCollector>,
    pool: Arc<dyn WorkerPool>,
    process_lookup: Arc<dyn ProcessLookup>,
    reporting: Reporting,
    event_bus: Option<Arc<dyn EventBus>>,
    stop_requested: AtomicBool,
    wake: (Mutex<()>, Condvar),
}

impl ControlLoop {
    pub fn new(
        config: WorkerLifecycleConfig,
        collector: Arc<dyn MetricsCollector>,
        pool: Arc<dyn WorkerPool>,
        process_lookup: Arc<dyn ProcessLookup>,
        reporter: Option<Arc<dyn Reporter>>,
        event_bus: Option<Arc<dyn EventBus>>,
    ) -> Arc<Self> {
        let verbose = config.worker_verbose;
        Arc::new(ControlLoop {
            config,
            collector,
            pool,
            process_lookup,
            reporting: Reporting::new(reporter, verbose),
            event_bus,
            stop_requested: AtomicBool::new(false),
            wake: (Mutex::new(()), Condvar::new()),
        })
    }

    /// Requests cooperative shutdown. Only flips a flag and wakes the sleep;
    /// in-flight work (a sweep already underway) is allowed to finish. Not
    /// re-entrant with itself: callers should not call `stop()` concurrently
    /// expecting ordering guarantees beyond "the loop exits at the next
    /// check".
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        let (lock, condvar) = &self.wake;
        let _guard = lock.lock().expect("wake lock poisoned");
        condvar.notify_all();
    }

    fn stop_was_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Spawns the control loop on its own named thread.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("wlm-control-loop".to_string())
            .spawn(move || self.run())
            .expect("failed to spawn wlm-control-loop thread")
    }

    /// Runs the control loop to completion on the calling thread. Returns
    /// immediately, doing no work, if both caps are zero (§4.1).
    pub fn run(&self) {
        if self.config.is_disabled() {
            return;
        }

        self.reporting.report_start();

        loop {
            if self.sleep_until_next_tick_or_stop() {
                return;
            }
            if self.stop_was_requested() {
                return;
            }

            let metrics = self.collector.live_metrics();
            self.reporting
                .maybe_report_usage_summary(metrics.len(), aggregate_usage_mb(&metrics));

            if self.config.total_worker_memory_limit_mb > 0 {
                match run_fleet_cap_pipeline(
                    self.pool.as_ref(),
                    &metrics,
                    self.config.total_worker_memory_limit_mb,
                    self.config.shrink_worker_pool,
                    &self.reporting,
                    self.event_bus.as_deref(),
                ) {
                    Ok(_events) => {}
                    Err(error) => {
                        tracing::error!(%error, "fleet-cap eviction pipeline failed this tick");
                    }
                }
            }

            if self.stop_was_requested() {
                return;
            }

            if self.config.worker_memory_limit_mb > 0 {
                let _events = kill_over_limit(
                    &metrics,
                    self.config.worker_memory_limit_mb,
                    self.process_lookup.as_ref(),
                    &self.reporting,
                    self.event_bus.as_deref(),
                );
            }
        }
    }

    /// Sleeps for the configured poll interval, or until `stop()` wakes it
    /// early. Returns `true` if shutdown was requested (either before or
    /// during the sleep).
    fn sleep_until_next_tick_or_stop(&self) -> bool {
        if self.stop_was_requested() {
            return true;
        }
        let (lock, condvar) = &self.wake;
        let guard = lock.lock().expect("wake lock poisoned");
        let interval = self.poll_interval();
        let _ = condvar.wait_timeout(guard, interval).expect("wake condvar poisoned");
        self.stop_was_requested()
    }

    fn poll_interval(&self) -> Duration {
        self.config.worker_metrics_poll_interval
    }
}

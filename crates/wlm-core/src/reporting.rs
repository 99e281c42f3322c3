//! The two report sinks (§4.6) plus the throttling/suppression state the
//! control loop needs around them.
//!
//! Logging via `tracing` always happens, independent of both the reporter and
//! `workerVerbose`. The optional [`Reporter`] is the user-facing sink, gated
//! by verbosity except for the per-worker-cap warning, which must always
//! reach the user because it can explain an in-flight action failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A human-facing message sink. Calls happen on the control-loop thread and
/// must not block it meaningfully.
pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// How often the "usage summary" message may be emitted, at most.
const USAGE_SUMMARY_MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Bundles the optional reporter with the control loop's throttling and
/// suppression state.
pub struct Reporting {
    reporter: Option<Arc<dyn Reporter>>,
    verbose: bool,
    empty_candidates_suppressed: AtomicBool,
    last_usage_summary: Mutex<Option<Instant>>,
}

impl Reporting {
    pub fn new(reporter: Option<Arc<dyn Reporter>>, verbose: bool) -> Self {
        Reporting {
            reporter,
            verbose,
            empty_candidates_suppressed: AtomicBool::new(false),
            last_usage_summary: Mutex::new(None),
        }
    }

    /// Logs at `info` unconditionally, and additionally forwards to the
    /// reporter only when `workerVerbose` is set.
    pub fn info_if_verbose(&self, message: &str) {
        tracing::info!("{message}");
        if self.verbose {
            if let Some(reporter) = &self.reporter {
                reporter.info(message);
            }
        }
    }

    /// Logs at `warn` and forwards to the reporter regardless of verbosity
    /// (§4.3 step 2: the per-worker-cap breach must always reach the user).
    pub fn warn_always(&self, message: &str) {
        tracing::warn!("{message}");
        if let Some(reporter) = &self.reporter {
            reporter.warn(message);
        }
    }

    /// Emits the "no eviction candidates found" message, but only if it was
    /// not already emitted on a prior, still-empty run (§4.2 final
    /// paragraph, invariant 6). Call with `candidates_empty = false` once the
    /// set becomes non-empty again to reset suppression.
    pub fn report_candidate_search(&self, candidates_empty: bool) {
        if !candidates_empty {
            self.empty_candidates_suppressed.store(false, Ordering::Release);
            return;
        }
        let already_suppressed = self.empty_candidates_suppressed.swap(true, Ordering::AcqRel);
        if !already_suppressed {
            self.info_if_verbose(
                "no fleet-cap eviction candidates found; usage remains above budget",
            );
        }
    }

    /// Emits the one-shot usage summary, throttled to at most once per
    /// minute, only while at least one worker exists.
    pub fn maybe_report_usage_summary(&self, worker_count: usize, used_mb: u64) {
        if worker_count == 0 {
            return;
        }
        let mut last = self.last_usage_summary.lock().expect("usage summary lock poisoned");
        let now = Instant::now();
        let should_emit = match *last {
            None => true,
            Some(prev) => now.duration_since(prev) >= USAGE_SUMMARY_MIN_INTERVAL,
        };
        if should_emit {
            *last = Some(now);
            drop(last);
            self.info_if_verbose(&format!(
                "worker fleet usage: {worker_count} workers, {used_mb} MB resident"
            ));
        }
    }

    /// Emits the one-shot control-loop start message.
    pub fn report_start(&self) {
        self.info_if_verbose("worker lifecycle manager control loop starting");
    }
}

//! The five configuration options §6 enumerates, loaded the way
//! `cloud-servers-oss/src/config.rs` loads its service config: a TOML file
//! merged with environment overrides via `figment`.

use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::WlmError;

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}

/// Configuration governing the worker lifecycle manager's control loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerLifecycleConfig {
    /// Fleet-wide memory budget in MB. `0` disables fleet-cap eviction.
    pub total_worker_memory_limit_mb: u64,

    /// Per-worker memory budget in MB. `0` disables per-worker killing.
    pub worker_memory_limit_mb: u64,

    /// The tick period.
    #[serde(with = "humantime_serde")]
    pub worker_metrics_poll_interval: Duration,

    /// Enables the shrink pass (§4.2 Step E) on top of fleet-cap eviction.
    pub shrink_worker_pool: bool,

    /// When `false`, informational messages go only to logs, not to the
    /// user-facing reporter. The per-worker-cap warning is always reported
    /// regardless of this setting.
    pub worker_verbose: bool,
}

impl Default for WorkerLifecycleConfig {
    fn default() -> Self {
        WorkerLifecycleConfig {
            total_worker_memory_limit_mb: 0,
            worker_memory_limit_mb: 0,
            worker_metrics_poll_interval: default_poll_interval(),
            shrink_worker_pool: false,
            worker_verbose: false,
        }
    }
}

impl WorkerLifecycleConfig {
    /// `true` when both caps are zero: the control loop does no work at all
    /// (§4.1).
    pub fn is_disabled(&self) -> bool {
        self.total_worker_memory_limit_mb == 0 && self.worker_memory_limit_mb == 0
    }

    /// Loads configuration from `config/wlm.toml` (if present) merged with
    /// `WLM__`-prefixed environment variables, e.g. `WLM__WORKER_VERBOSE=true`
    /// or `WLM__WORKER_METRICS_POLL_INTERVAL=30s`.
    pub fn load() -> Result<Self, WlmError> {
        Figment::new()
            .merge(Toml::file("config/wlm.toml"))
            .merge(Env::prefixed("WLM__").split("__"))
            .extract()
            .map_err(WlmError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disabled() {
        assert!(WorkerLifecycleConfig::default().is_disabled());
    }

    #[test]
    fn test_nonzero_fleet_cap_is_enabled() {
        let mut config = WorkerLifecycleConfig::default();
        config.total_worker_memory_limit_mb = 4096;
        assert!(!config.is_disabled());
    }

    #[test]
    fn test_nonzero_per_worker_cap_is_enabled() {
        let mut config = WorkerLifecycleConfig::default();
        config.worker_memory_limit_mb = 1024;
        assert!(!config.is_disabled());
    }

    #[test]
    fn test_default_poll_interval_is_ten_seconds() {
        assert_eq!(
            WorkerLifecycleConfig::default().worker_metrics_poll_interval,
            Duration::from_secs(10)
        );
    }
}

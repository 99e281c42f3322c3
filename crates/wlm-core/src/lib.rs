// wlm-core: memory-budget enforcement for a pool of long-lived worker processes.

pub mod config;
pub mod control_loop;
pub mod error;
pub mod events;
pub mod killer;
pub mod memory_order;
pub mod metrics;
pub mod pool;
pub mod reporting;
pub mod selector;
pub mod status;
pub mod sysinfo_support;
pub mod testkit;

pub use config::WorkerLifecycleConfig;
pub use control_loop::ControlLoop;
pub use error::WlmError;
pub use events::{EventBus, WorkerEvictedEvent};
pub use killer::{ProcessHandle, ProcessLookup};
pub use metrics::{MetricsCollector, WorkerId, WorkerProcessMetrics};
pub use pool::{IdleWorker, PoolSweep, SweepVerdict, WorkerPool};
pub use reporting::Reporter;
pub use status::{Status, StatusValue};
pub use sysinfo_support::{RegisteredWorker, SysinfoMetricsCollector, SysinfoProcessLookup};

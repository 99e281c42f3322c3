//! The machine-observer event type and sink (§3, §6).
//!
//! One [`WorkerEvictedEvent`] is posted per logical worker id per eviction,
//! never per process — a process multiplexing three ids that gets evicted
//! produces three events.

use serde::{Deserialize, Serialize};

use crate::metrics::WorkerId;

/// Published once per logical worker id whenever that id's worker is evicted
/// or killed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerEvictedEvent {
    pub worker_id: WorkerId,
    pub worker_key_hash: String,
    pub mnemonic: String,
}

/// Fire-and-forget sink for [`WorkerEvictedEvent`]s. Optional: the control
/// loop runs with or without one attached.
pub trait EventBus: Send + Sync {
    fn post(&self, event: WorkerEvictedEvent);
}

//! The pool collaborator contract (§4.5, §6) and the two-phase sweep built on
//! top of it.
//!
//! The worker pool itself is an external collaborator (§1 Out of scope): this
//! module only specifies the trait the WLM needs from it, plus
//! [`PoolSweep`], which re-expresses the spec's "inspect then destructive"
//! two-phase design as two calls into the *same* underlying primitive,
//! [`WorkerPool::evict_with_policy`]. The phase is encoded entirely by
//! whether the policy closure ever returns [`SweepVerdict::Destroy`] — this
//! avoids duplicating the pool's own iteration-locking logic for each phase.

use crate::error::WlmError;
use crate::metrics::WorkerId;
use crate::status::{Status, StatusValue};
use std::collections::HashSet;

/// One idle pooled object visited during a sweep.
pub struct IdleWorker {
    /// The logical worker id this idle object is parked under.
    pub worker_id: WorkerId,
    /// Shared status handle for the worker *process* this id belongs to.
    pub status: Status,
}

/// The verdict a sweep policy returns for one idle worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepVerdict {
    /// Leave the worker parked in the pool.
    Keep,
    /// Destroy the worker through the pool's destruction path (bypassing
    /// normal return-to-pool).
    Destroy,
}

/// The external keyed object pool the WLM sweeps for eviction candidates.
///
/// Implementations must serialize visits so a worker cannot be checked out
/// mid-sweep for the sub-pool traversal currently in progress (§4.5, §6).
/// Per §7, a sweep failure that is not interruption is the pool's own to log
/// and recover from internally where possible; `Err` here is reserved for
/// failures the pool cannot absorb and must surface, which abandons the
/// current tick rather than being mistaken for "no candidates found".
pub trait WorkerPool: Send + Sync {
    /// Visits every idle pooled object across every sub-pool exactly once,
    /// invoking `policy` for each and returning the set of ids for which
    /// `policy` returned [`SweepVerdict::Destroy`] *and* destruction was
    /// actually signalled (a candidate can escape if it was checked out
    /// between enumeration and the destroy call).
    fn evict_with_policy(
        &self,
        policy: &mut dyn FnMut(&IdleWorker) -> SweepVerdict,
    ) -> Result<HashSet<WorkerId>, WlmError>;
}

/// The two sweep modes the WLM needs, both built on [`WorkerPool::evict_with_policy`].
pub struct PoolSweep;

impl PoolSweep {
    /// Enumerates every currently-idle worker id without destroying anything.
    ///
    /// Implemented as a sweep whose policy always returns [`SweepVerdict::Keep`];
    /// since nothing is ever destroyed, the returned set from
    /// `evict_with_policy` is empty, so `inspect` collects ids itself via the
    /// policy closure's side channel instead.
    pub fn inspect(pool: &dyn WorkerPool) -> Result<HashSet<WorkerId>, WlmError> {
        let mut seen = HashSet::new();
        let mut record = |w: &IdleWorker| -> SweepVerdict {
            seen.insert(w.worker_id);
            SweepVerdict::Keep
        };
        pool.evict_with_policy(&mut record)?;
        Ok(seen)
    }

    /// Destroys every idle worker whose id is in `candidates`, tagging each
    /// one's [`Status`] to [`StatusValue::PendingKillDueToMemoryPressure`]
    /// before signalling destruction (§4.2 Step D).
    ///
    /// Returns the subset of `candidates` actually destroyed.
    pub fn destructive(
        pool: &dyn WorkerPool,
        candidates: &HashSet<WorkerId>,
    ) -> Result<HashSet<WorkerId>, WlmError> {
        let mut decide = |w: &IdleWorker| -> SweepVerdict {
            if candidates.contains(&w.worker_id) {
                w.status.maybe_update(StatusValue::PendingKillDueToMemoryPressure);
                SweepVerdict::Destroy
            } else {
                SweepVerdict::Keep
            }
        };
        pool.evict_with_policy(&mut decide)
    }
}

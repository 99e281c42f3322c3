//! The worker-process status state machine shared between the WLM and the pool.
//!
//! [`Status`] is a cheap, cloneable handle (an `Arc<AtomicU8>`) so both the
//! control loop and the pool's return-to-pool path can hold a copy and mutate
//! it concurrently. Transitions only ever move toward "more dead":
//! [`Status::maybe_update`] is a compare-and-swap loop that refuses to move the
//! state backward, and is a no-op if the current state already is at or past
//! the requested one.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// A point in the worker-process status state machine.
///
/// Ordered so that `Alive < PendingKillDueToMemoryPressure <
/// KilledDueToMemoryPressure`; [`Status::maybe_update`] relies on this
/// ordering to reject backward transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum StatusValue {
    /// Initial state: the worker process is live and not flagged for removal.
    Alive = 0,
    /// Marked by the WLM when a worker could not be removed immediately
    /// (checked out, or already scheduled for destruction by the pool's own
    /// sweep). The pool must destroy rather than return this worker on next
    /// check-in.
    PendingKillDueToMemoryPressure = 1,
    /// Terminal: the OS process has been forcibly terminated.
    KilledDueToMemoryPressure = 2,
}

impl StatusValue {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => StatusValue::Alive,
            1 => StatusValue::PendingKillDueToMemoryPressure,
            _ => StatusValue::KilledDueToMemoryPressure,
        }
    }
}

/// A shared, atomically-updated handle to one worker process's [`StatusValue`].
///
/// Clones refer to the same underlying state (`Arc`-backed); this is the
/// handle type that `WorkerProcessMetrics` carries and that both the WLM and
/// the pool's return-to-pool path mutate.
#[derive(Debug, Clone)]
pub struct Status(Arc<AtomicU8>);

impl Status {
    /// Creates a new handle in the initial [`StatusValue::Alive`] state.
    pub fn new() -> Self {
        Status(Arc::new(AtomicU8::new(StatusValue::Alive as u8)))
    }

    /// Returns the current status.
    pub fn current(&self) -> StatusValue {
        StatusValue::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Atomically advances the status to `target` if `target` is strictly
    /// "more dead" than the current value. Returns `true` if the transition
    /// happened, `false` if it was a no-op (current state already at or past
    /// `target`).
    ///
    /// This is the only mutation path: there is no way to move a `Status`
    /// backward through this API.
    pub fn maybe_update(&self, target: StatusValue) -> bool {
        loop {
            let current = self.0.load(Ordering::Acquire);
            if current >= target as u8 {
                return false;
            }
            match self.0.compare_exchange(
                current,
                target as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(_) => continue,
            }
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_status_is_alive() {
        let status = Status::new();
        assert_eq!(status.current(), StatusValue::Alive);
    }

    #[test]
    fn test_maybe_update_advances_forward() {
        let status = Status::new();
        assert!(status.maybe_update(StatusValue::PendingKillDueToMemoryPressure));
        assert_eq!(status.current(), StatusValue::PendingKillDueToMemoryPressure);
    }

    #[test]
    fn test_maybe_update_rejects_backward_transition() {
        let status = Status::new();
        assert!(status.maybe_update(StatusValue::KilledDueToMemoryPressure));
        // Attempting to move back to PendingKill must be a no-op.
        assert!(!status.maybe_update(StatusValue::PendingKillDueToMemoryPressure));
        assert_eq!(status.current(), StatusValue::KilledDueToMemoryPressure);
    }

    #[test]
    fn test_maybe_update_same_value_is_noop() {
        let status = Status::new();
        assert!(status.maybe_update(StatusValue::PendingKillDueToMemoryPressure));
        assert!(!status.maybe_update(StatusValue::PendingKillDueToMemoryPressure));
    }

    #[test]
    fn test_clone_shares_state() {
        let status = Status::new();
        let clone = status.clone();
        assert!(clone.maybe_update(StatusValue::KilledDueToMemoryPressure));
        assert_eq!(status.current(), StatusValue::KilledDueToMemoryPressure);
    }
}

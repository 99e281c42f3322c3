//! Structured errors for the small set of genuinely fallible WLM operations.
//!
//! Per §7, thread interruption is shutdown, not an error, and is modeled as
//! control flow in [`crate::control_loop`] rather than as a variant here.
//! Transient observation gaps (a pid with no resolvable process handle) are
//! likewise not errors — they are logged and skipped (§4.3 step 1).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WlmError {
    /// A pool sweep failed for a reason other than interruption. The pool
    /// owns recovery/logging for its own internals (§7); this variant exists
    /// so the control loop can abandon the current tick instead of silently
    /// treating a genuine bug as "no candidates found".
    #[error("pool sweep failed: {0}")]
    PoolSweepFailed(String),

    /// Configuration could not be loaded or failed validation.
    #[error("failed to load worker lifecycle configuration: {0}")]
    Config(#[from] figment::Error),
}

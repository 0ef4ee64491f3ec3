//! Run-level pipeline errors
//!
//! Per-item failures never surface here; they are swallowed at the item
//! boundary and reflected only in the run's counters and warning logs. These
//! variants are the unrecoverable cases that abort a run, and each one is
//! recorded as a `run_failed` event before it propagates.

use pricewatch_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The store was unreachable before any item was attempted.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(StoreError),

    /// The extraction collaborator handed us nothing usable.
    #[error("Extraction produced an empty batch")]
    EmptyBatch,

    /// The run itself finished but its terminating event could not be
    /// appended, so the audit trail is incomplete.
    #[error("Failed to record run event: {0}")]
    EventLog(#[from] StoreError),
}

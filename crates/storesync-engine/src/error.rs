//! Engine error types and the retry backoff schedule.

use std::time::Duration;

use storesync_state::StoreError;

/// Errors produced by engine operations.
///
/// [`SyncError::Connectivity`] aborts a run before the queue is touched;
/// per-item write failures never surface here, they are absorbed by the
/// retry loop and the error ledger.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A second run was requested while one is in progress.
    #[error("a sync run is already in progress")]
    AlreadyRunning,

    /// Source fetch or destination connection failure.
    #[error("connectivity failure: {0}")]
    Connectivity(String),

    /// Durable queue store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Anything else from the infrastructure layers.
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, SyncError>;

const BASE_BACKOFF_MS: u64 = 1_000;
const MAX_BACKOFF_MS: u64 = 60_000;

/// Delay before retrying a failed write, doubling per attempt.
///
/// Attempt 1 waits 1 s, attempt 2 waits 2 s, attempt 3 waits 4 s, capped
/// at 60 s.
#[must_use]
pub fn compute_backoff(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let ms = BASE_BACKOFF_MS
        .saturating_mul(1u64 << exponent)
        .min(MAX_BACKOFF_MS);
    Duration::from_millis(ms)
}

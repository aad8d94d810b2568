//! Queue store trait definition.
//!
//! [`QueueStore`] is the sole gateway to work item admission, extraction,
//! and state transition, plus the error ledger, run history, and daily
//! aggregates persisted alongside the queue. Model types live in
//! [`storesync_types`].

use std::collections::BTreeMap;

use storesync_types::{
    DailyAggregate, ErrorKind, ErrorRecord, ItemStatus, ProductRecord, QueueStats, SyncRun,
    SyncType, TodayStats, TriggerType, WorkItem,
};

use crate::error;

/// Filters for the read-only queue page view.
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    /// Restrict to one status; `None` means all.
    pub status: Option<ItemStatus>,
    /// Case-sensitive substring match against key or display name.
    pub search: Option<String>,
}

/// Pagination envelope for a page query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u64,
}

/// One page of queue rows.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Storage contract for the durable queue and its ledgers.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn QueueStore>`.
/// Single-consumer semantics: [`QueueStore::dequeue_next`] is the only
/// extraction primitive and no cross-process mutual exclusion is provided.
pub trait QueueStore: Send + Sync {
    // -- admission ----------------------------------------------------------

    /// Upsert one record by natural key.
    ///
    /// Always replaces the stored payload, resets status to pending and
    /// attempts to 0 — re-admission restarts the retry budget even for an
    /// item currently mid-processing (observed force-refresh semantics).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn admit(&self, record: &ProductRecord, sync_type: SyncType) -> error::Result<()>;

    /// Admit a batch atomically. Same per-item semantics as [`Self::admit`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn admit_batch(&self, records: &[ProductRecord], sync_type: SyncType) -> error::Result<u64>;

    // -- extraction and transitions ----------------------------------------

    /// The single oldest pending item with attempts remaining, or `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn dequeue_next(&self) -> error::Result<Option<WorkItem>>;

    /// pending → processing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn mark_processing(&self, natural_key: &str) -> error::Result<()>;

    /// processing → completed; clears the last error and stamps
    /// `processed_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn mark_completed(&self, natural_key: &str) -> error::Result<()>;

    /// processing → failed, counting the final attempt (capped at the
    /// budget) and recording the terminal error message.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn mark_failed(&self, natural_key: &str, message: &str) -> error::Result<()>;

    /// processing → pending with attempts incremented (retry path).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn requeue_with_increment(&self, natural_key: &str) -> error::Result<()>;

    // -- observability ------------------------------------------------------

    /// Read-only page view with fixed priority ordering
    /// (processing, pending, failed, completed) then recency.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn page(&self, filter: &QueueFilter, page: u32, per_page: u32)
        -> error::Result<Page<WorkItem>>;

    /// Counts per status across the whole queue.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn stats(&self) -> error::Result<QueueStats>;

    /// Counts and success rate for rows touched today.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn stats_today(&self) -> error::Result<TodayStats>;

    /// Count of items currently in one status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn count_by_status(&self, status: ItemStatus) -> error::Result<u64>;

    /// Mean `(processed_at − created_at)` in milliseconds over completed
    /// items from the last 24 hours; a fixed fallback when no samples
    /// exist. Feeds ETA estimates.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn average_recent_duration_ms(&self) -> error::Result<f64>;

    /// All failed items, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn failed_items(&self) -> error::Result<Vec<WorkItem>>;

    // -- operator recovery --------------------------------------------------

    /// Reset every failed item to pending with a fresh retry budget.
    /// Returns the number of items reset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn retry_failed(&self) -> error::Result<u64>;

    /// Reset one failed item to pending with a fresh retry budget.
    /// Returns `true` if the item existed and was failed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn retry_single(&self, natural_key: &str) -> error::Result<bool>;

    // -- reaper -------------------------------------------------------------

    /// Items stuck in processing longer than `timeout_minutes`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn find_stuck(&self, timeout_minutes: u32) -> error::Result<Vec<WorkItem>>;

    /// Force-reset stuck processing items to pending, attempts unchanged.
    /// Returns the number of items reset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn reset_stuck(&self, timeout_minutes: u32) -> error::Result<u64>;

    // -- retention ----------------------------------------------------------

    /// Delete completed items processed more than `older_than_days` ago.
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn purge_completed(&self, older_than_days: u32) -> error::Result<u64>;

    // -- error ledger -------------------------------------------------------

    /// Append one row to the error ledger.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn record_error(
        &self,
        natural_key: Option<&str>,
        kind: ErrorKind,
        message: &str,
        stack_trace: Option<&str>,
    ) -> error::Result<()>;

    /// Unresolved errors from the last `hours`, newest first, capped at 50.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn recent_errors(&self, hours: u32) -> error::Result<Vec<ErrorRecord>>;

    /// Unresolved error counts per kind over the last `hours`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn error_breakdown(&self, hours: u32) -> error::Result<BTreeMap<ErrorKind, u64>>;

    /// Flip the resolved flag on one ledger row.
    /// Returns `true` if the row existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn mark_error_resolved(&self, error_id: i64) -> error::Result<bool>;

    // -- history and aggregates --------------------------------------------

    /// Append one immutable run history row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn add_history(
        &self,
        batch_id: &str,
        total: u64,
        successful: u64,
        failed: u64,
        duration_ms: i64,
        started_at: &str,
        trigger_type: TriggerType,
    ) -> error::Result<()>;

    /// Most recent runs, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn history(&self, limit: u32) -> error::Result<Vec<SyncRun>>;

    /// Upsert the daily aggregate row for `date` by accumulation: counts
    /// add, the duration estimate averages with the stored value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn accumulate_daily(
        &self,
        date: &str,
        total: u64,
        successful: u64,
        failed: u64,
        avg_duration_ms: i64,
    ) -> error::Result<()>;

    /// Daily aggregates for the last seven days, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    fn last_seven_days(&self) -> error::Result<Vec<DailyAggregate>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify the trait is object-safe (can be used as `dyn QueueStore`).
    #[test]
    fn trait_is_object_safe() {
        fn _assert_object_safe(_: &dyn QueueStore) {}
    }
}

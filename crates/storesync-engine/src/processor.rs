//! Per-item retry loop around the destination writer.

use std::sync::Arc;

use storesync_state::QueueStore;
use storesync_types::{ErrorKind, WorkItem};

use crate::destination::CatalogWriter;
use crate::error::{compute_backoff, Result};

/// Terminal outcome of processing one work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The write landed; `attempts` is the attempt number that succeeded.
    Completed { attempts: u32 },
    /// The retry budget ran out; the item is marked failed.
    Failed { attempts: u32, error: String },
}

/// Drives one item through mark-processing, write, and bounded retries.
///
/// Every failed write is recorded in the error ledger and increments the
/// item's attempt count, so a crash mid-backoff resumes with the budget
/// already spent.
pub struct Processor {
    store: Arc<dyn QueueStore>,
    writer: Arc<dyn CatalogWriter>,
}

impl Processor {
    #[must_use]
    pub fn new(store: Arc<dyn QueueStore>, writer: Arc<dyn CatalogWriter>) -> Self {
        Self { store, writer }
    }

    /// Process one item to a terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`](crate::SyncError::Store) if the queue
    /// store itself fails; writer failures are absorbed into the outcome.
    pub async fn process_with_retry(&self, item: &WorkItem) -> Result<ProcessOutcome> {
        let key = item.natural_key.as_str();
        let mut last_error = String::from("retry budget exhausted");

        for attempt in (item.attempts + 1)..=item.max_attempts {
            self.store.mark_processing(key)?;
            tracing::debug!(natural_key = key, attempt, "Writing item to destination");

            match self.writer.write_item(&item.payload).await {
                Ok(()) => {
                    self.store.mark_completed(key)?;
                    tracing::info!(natural_key = key, attempt, "Item synchronized");
                    return Ok(ProcessOutcome::Completed { attempts: attempt });
                }
                Err(e) => {
                    last_error = e.to_string();
                    let chain = format!("{e:?}");
                    self.store
                        .record_error(Some(key), ErrorKind::Processing, &last_error, Some(&chain))?;

                    // The final attempt goes straight to failed below;
                    // requeueing first would strand a pending row with no
                    // budget left if we crashed in between.
                    if attempt < item.max_attempts {
                        self.store.requeue_with_increment(key)?;
                        let wait = compute_backoff(attempt);
                        tracing::warn!(
                            natural_key = key,
                            attempt,
                            wait_ms = wait.as_millis(),
                            error = %last_error,
                            "Write failed, retrying"
                        );
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }

        self.store.mark_failed(key, &last_error)?;
        tracing::error!(natural_key = key, error = %last_error, "Item failed permanently");
        Ok(ProcessOutcome::Failed {
            attempts: item.max_attempts,
            error: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use storesync_state::SqliteStore;
    use storesync_types::{ItemStatus, ProductRecord, SyncType};

    struct FlakyWriter {
        failures_left: Mutex<u32>,
    }

    impl FlakyWriter {
        fn failing(times: u32) -> Arc<Self> {
            Arc::new(Self {
                failures_left: Mutex::new(times),
            })
        }
    }

    #[async_trait]
    impl CatalogWriter for FlakyWriter {
        async fn write_item(&self, _record: &ProductRecord) -> anyhow::Result<()> {
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                anyhow::bail!("write rejected")
            }
            Ok(())
        }

        async fn health_check(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn queued_item(store: &Arc<SqliteStore>) -> WorkItem {
        let mut record = ProductRecord::bare("A1");
        record.display_name = Some("Widget".into());
        store.admit(&record, SyncType::Update).unwrap();
        store.dequeue_next().unwrap().unwrap()
    }

    #[tokio::test]
    async fn first_attempt_success() {
        let store: Arc<SqliteStore> = Arc::new(SqliteStore::in_memory().unwrap());
        let item = queued_item(&store);
        let processor = Processor::new(store.clone(), FlakyWriter::failing(0));

        let outcome = processor.process_with_retry(&item).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::Completed { attempts: 1 });
        assert_eq!(store.count_by_status(ItemStatus::Completed).unwrap(), 1);
        assert!(store.recent_errors(24).unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_recovers_on_retry() {
        let store: Arc<SqliteStore> = Arc::new(SqliteStore::in_memory().unwrap());
        let item = queued_item(&store);
        let processor = Processor::new(store.clone(), FlakyWriter::failing(1));

        let outcome = processor.process_with_retry(&item).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::Completed { attempts: 2 });
        assert_eq!(store.count_by_status(ItemStatus::Completed).unwrap(), 1);
        assert_eq!(store.recent_errors(24).unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_failure_exhausts_budget() {
        let store: Arc<SqliteStore> = Arc::new(SqliteStore::in_memory().unwrap());
        let item = queued_item(&store);
        let processor = Processor::new(store.clone(), FlakyWriter::failing(u32::MAX));

        let outcome = processor.process_with_retry(&item).await.unwrap();
        assert_eq!(
            outcome,
            ProcessOutcome::Failed {
                attempts: 3,
                error: "write rejected".into()
            }
        );

        let failed = store.failed_items().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].attempts, 3);
        assert_eq!(failed[0].last_error.as_deref(), Some("write rejected"));

        // One ledger row per attempt.
        let errors = store.recent_errors(24).unwrap();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| e.kind == ErrorKind::Processing));
        assert!(store.dequeue_next().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_failure_leaves_no_pending_row() {
        let store: Arc<SqliteStore> = Arc::new(SqliteStore::in_memory().unwrap());
        let item = queued_item(&store);
        let processor = Processor::new(store.clone(), FlakyWriter::failing(u32::MAX));

        processor.process_with_retry(&item).await.unwrap();

        // The last transition is processing -> failed, so no exhausted
        // item can be left sitting in pending where neither the drain,
        // the failed listing, nor the reaper would ever see it.
        assert_eq!(store.count_by_status(ItemStatus::Pending).unwrap(), 0);
        assert_eq!(store.count_by_status(ItemStatus::Processing).unwrap(), 0);
        assert_eq!(store.count_by_status(ItemStatus::Failed).unwrap(), 1);
        let failed = store.failed_items().unwrap();
        assert_eq!(failed[0].attempts, failed[0].max_attempts);
    }

    #[tokio::test]
    async fn exhausted_item_fails_without_write() {
        let store: Arc<SqliteStore> = Arc::new(SqliteStore::in_memory().unwrap());
        let mut item = queued_item(&store);
        item.attempts = item.max_attempts;
        let processor = Processor::new(store.clone(), FlakyWriter::failing(0));

        let outcome = processor.process_with_retry(&item).await.unwrap();
        assert!(matches!(outcome, ProcessOutcome::Failed { .. }));
        assert_eq!(store.count_by_status(ItemStatus::Failed).unwrap(), 1);
    }
}

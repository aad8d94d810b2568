//! Batch orchestrator: one sync run from fetch to report.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;

use storesync_state::QueueStore;
use storesync_types::{
    batch_id_at, ErrorKind, ItemStatus, QueueStats, RunStats, SyncEvent, SyncType, TriggerType,
};

use crate::error::{Result, SyncError};
use crate::events::EventBus;
use crate::notify::{Notifier, RunReport};
use crate::processor::{ProcessOutcome, Processor};
use crate::source::CatalogSource;

const STATS_SNAPSHOT_EVERY: u64 = 10;
const BREAKDOWN_WINDOW_HOURS: u32 = 24;

/// Control-surface view of the engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineStatus {
    pub running: bool,
    pub queue: QueueStats,
}

/// Owns the moving parts of a sync run and serializes runs through an
/// explicit idle/running guard.
pub struct SyncEngine {
    store: Arc<dyn QueueStore>,
    source: Arc<dyn CatalogSource>,
    processor: Processor,
    notifier: Arc<dyn Notifier>,
    events: EventBus,
    running: AtomicBool,
    stuck_timeout_minutes: u32,
}

impl SyncEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn QueueStore>,
        source: Arc<dyn CatalogSource>,
        writer: Arc<dyn crate::destination::CatalogWriter>,
        notifier: Arc<dyn Notifier>,
        stuck_timeout_minutes: u32,
    ) -> Self {
        let processor = Processor::new(store.clone(), writer);
        Self {
            store,
            source,
            processor,
            notifier,
            events: EventBus::default(),
            running: AtomicBool::new(false),
            stuck_timeout_minutes,
        }
    }

    /// The event surface; subscribe before starting a run.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Execute one full sync run.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyRunning`] without touching anything if
    /// a run is in progress, [`SyncError::Connectivity`] if the source
    /// fetch fails (before any queue mutation), or a store error.
    pub async fn start_sync(&self, trigger: TriggerType) -> Result<RunReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::AlreadyRunning);
        }

        let result = self.run_once(trigger).await;
        self.running.store(false, Ordering::SeqCst);

        if let Err(e) = &result {
            self.notifier.run_error(&e.to_string()).await;
        }
        result
    }

    async fn run_once(&self, trigger: TriggerType) -> Result<RunReport> {
        let started = Utc::now();
        let batch_id = batch_id_at(started);

        let records = match self.source.fetch_catalog().await {
            Ok(records) => records,
            Err(e) => {
                self.store
                    .record_error(None, ErrorKind::Connectivity, &e.to_string(), None)?;
                return Err(e);
            }
        };

        let partition = crate::validator::validate_batch(records);
        for rejection in &partition.invalid {
            let reasons = rejection.reasons.join("; ");
            tracing::warn!(
                natural_key = %rejection.record.natural_key,
                reasons = %reasons,
                "Record rejected before admission"
            );
            self.store.record_error(
                Some(&rejection.record.natural_key),
                ErrorKind::Validation,
                &reasons,
                None,
            )?;
        }

        let admitted = self.store.admit_batch(&partition.valid, SyncType::Update)?;
        tracing::info!(
            batch_id = %batch_id,
            admitted,
            rejected = partition.invalid.len(),
            "Catalog admitted to queue"
        );

        self.notifier.run_started(&batch_id, admitted).await;
        self.events.publish(SyncEvent::RunStarted {
            batch_id: batch_id.clone(),
            total: admitted,
        });

        let stats = self.drain().await?;

        let duration_ms = (Utc::now() - started).num_milliseconds();
        let started_at = started.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        self.store.add_history(
            &batch_id,
            stats.total,
            stats.successful,
            stats.failed,
            duration_ms,
            &started_at,
            trigger,
        )?;

        let date = started.format("%Y-%m-%d").to_string();
        let total = i64::try_from(stats.total).unwrap_or(i64::MAX);
        let avg_ms = if total > 0 { duration_ms / total } else { 0 };
        self.store
            .accumulate_daily(&date, stats.total, stats.successful, stats.failed, avg_ms)?;

        let breakdown = self.store.error_breakdown(BREAKDOWN_WINDOW_HOURS)?;
        let report = RunReport {
            batch_id: batch_id.clone(),
            stats,
            duration_ms,
            breakdown,
            trigger,
        };

        self.notifier.run_completed(&report).await;
        self.events
            .publish(SyncEvent::RunCompleted { batch_id, stats });
        Ok(report)
    }

    /// Drain the queue sequentially until no eligible item remains.
    async fn drain(&self) -> Result<RunStats> {
        let mut stats = RunStats::default();
        let mut processed: u64 = 0;

        while let Some(item) = self.store.dequeue_next()? {
            processed += 1;
            let pending = self
                .store
                .count_by_status(ItemStatus::Pending)?
                .saturating_sub(1);
            self.events.publish(SyncEvent::Progress {
                processed,
                successful: stats.successful,
                failed: stats.failed,
                current: item.natural_key.clone(),
                pending,
            });

            match self.processor.process_with_retry(&item).await? {
                ProcessOutcome::Completed { .. } => {
                    stats.successful += 1;
                    self.events.publish(SyncEvent::ItemCompleted {
                        natural_key: item.natural_key.clone(),
                    });
                    self.source.acknowledge(&item.natural_key).await;
                }
                ProcessOutcome::Failed { error, .. } => {
                    stats.failed += 1;
                    self.events.publish(SyncEvent::ItemFailed {
                        natural_key: item.natural_key.clone(),
                        error,
                    });
                }
            }
            stats.total += 1;

            if processed % STATS_SNAPSHOT_EVERY == 0 {
                self.events.publish(SyncEvent::StatsSnapshot {
                    stats: self.store.stats()?,
                });
            }
        }

        self.events.publish(SyncEvent::StatsSnapshot {
            stats: self.store.stats()?,
        });
        Ok(stats)
    }

    /// Reaper entry point: alert on and reset items stuck in processing.
    ///
    /// Safe to call while a run is active; a genuinely in-flight item is
    /// younger than the timeout and stays untouched.
    ///
    /// # Errors
    ///
    /// Returns a store error if the queue cannot be inspected or updated.
    pub async fn check_stuck_processing(&self) -> Result<u64> {
        let stuck = self.store.find_stuck(self.stuck_timeout_minutes)?;
        if stuck.is_empty() {
            return Ok(0);
        }
        self.notifier.stuck_queue(&stuck).await;
        let reset = self.store.reset_stuck(self.stuck_timeout_minutes)?;
        tracing::warn!(reset, "Stuck processing items reset to pending");
        Ok(reset)
    }

    /// Push the last seven days of aggregates to the notifier.
    ///
    /// # Errors
    ///
    /// Returns a store error if the aggregates cannot be read.
    pub async fn send_daily_report(&self) -> Result<()> {
        let days = self.store.last_seven_days()?;
        self.notifier.daily_report(&days).await;
        Ok(())
    }

    /// Running flag plus queue counts.
    ///
    /// # Errors
    ///
    /// Returns a store error if the queue cannot be inspected.
    pub fn status(&self) -> Result<EngineStatus> {
        Ok(EngineStatus {
            running: self.is_running(),
            queue: self.store.stats()?,
        })
    }
}

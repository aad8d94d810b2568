//! Operator notifications at run boundaries.
//!
//! Transports (chat, email) implement [`Notifier`]; the engine only knows
//! the trait. [`LogNotifier`] is the default and writes structured log
//! events.

use std::collections::BTreeMap;

use async_trait::async_trait;

use storesync_types::{DailyAggregate, ErrorKind, RunStats, TriggerType, WorkItem};

/// Summary handed to [`Notifier::run_completed`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub batch_id: String,
    pub stats: RunStats,
    pub duration_ms: i64,
    /// Unresolved error counts per kind over the last 24 hours.
    pub breakdown: BTreeMap<ErrorKind, u64>,
    pub trigger: TriggerType,
}

/// Notification sink for run lifecycle and queue health.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn run_started(&self, batch_id: &str, total: u64);
    async fn run_completed(&self, report: &RunReport);
    async fn run_error(&self, message: &str);
    async fn stuck_queue(&self, items: &[WorkItem]);
    async fn daily_report(&self, days: &[DailyAggregate]);
}

/// Default notifier writing structured tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn run_started(&self, batch_id: &str, total: u64) {
        tracing::info!(batch_id, total, "Sync run started");
    }

    async fn run_completed(&self, report: &RunReport) {
        tracing::info!(
            batch_id = %report.batch_id,
            total = report.stats.total,
            successful = report.stats.successful,
            failed = report.stats.failed,
            duration_ms = report.duration_ms,
            trigger = %report.trigger,
            "Sync run completed"
        );
        for (kind, count) in &report.breakdown {
            tracing::info!(kind = %kind, count, "Unresolved errors in the last 24h");
        }
    }

    async fn run_error(&self, message: &str) {
        tracing::error!(message, "Sync run failed");
    }

    async fn stuck_queue(&self, items: &[WorkItem]) {
        tracing::warn!(count = items.len(), "Stuck processing items detected");
        for item in items {
            tracing::warn!(
                natural_key = %item.natural_key,
                attempts = item.attempts,
                updated_at = %item.updated_at,
                "Stuck item reset to pending"
            );
        }
    }

    async fn daily_report(&self, days: &[DailyAggregate]) {
        for day in days {
            tracing::info!(
                date = %day.date,
                total = day.total_synced,
                successful = day.successful,
                failed = day.failed,
                avg_duration_ms = day.avg_duration_ms,
                "Daily sync totals"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifier_is_object_safe() {
        fn _assert_object_safe(_: &dyn Notifier) {}
    }

    #[tokio::test]
    async fn log_notifier_accepts_all_calls() {
        let notifier = LogNotifier;
        notifier.run_started("20260301-093000", 3).await;
        notifier.run_error("fetch timed out").await;
        notifier.stuck_queue(&[]).await;
        notifier.daily_report(&[]).await;
        notifier
            .run_completed(&RunReport {
                batch_id: "20260301-093000".into(),
                stats: RunStats {
                    total: 3,
                    successful: 2,
                    failed: 1,
                },
                duration_ms: 1200,
                breakdown: BTreeMap::new(),
                trigger: TriggerType::Manual,
            })
            .await;
    }
}

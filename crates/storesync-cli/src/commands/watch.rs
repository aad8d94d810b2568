use std::time::Duration;

use anyhow::Result;
use chrono::{Timelike, Utc};

use storesync_engine::config::parse_hhmm;
use storesync_engine::{Config, SyncError};
use storesync_state::QueueStore;
use storesync_types::TriggerType;

const CLOCK_TICK: Duration = Duration::from_secs(30);

/// Execute the `watch` command: unattended mode until Ctrl-C.
///
/// Runs the reaper on its configured interval, fires the daily sync at
/// the configured wall-clock time, and sweeps retention once a day.
pub async fn execute(config: &Config) -> Result<()> {
    let runtime = super::build_runtime(config).await?;

    let daily_sync = config
        .schedule
        .daily_sync
        .as_deref()
        .map(|s| parse_hhmm(s).ok_or_else(|| anyhow::anyhow!("invalid daily_sync time: {s}")))
        .transpose()?;
    let purge_at = parse_hhmm(&config.schedule.purge_time)
        .ok_or_else(|| anyhow::anyhow!("invalid purge_time: {}", config.schedule.purge_time))?;

    let reaper_period =
        Duration::from_secs(u64::from(config.schedule.reaper_interval_minutes.max(1)) * 60);
    let mut reaper = tokio::time::interval(reaper_period);
    reaper.tick().await; // immediate first tick, skip it
    let mut clock = tokio::time::interval(CLOCK_TICK);

    let mut last_sync_day: Option<String> = None;
    let mut last_purge_day: Option<String> = None;

    tracing::info!(
        daily_sync = ?config.schedule.daily_sync,
        reaper_minutes = config.schedule.reaper_interval_minutes,
        purge_time = %config.schedule.purge_time,
        "Watch mode started"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
            _ = reaper.tick() => {
                if let Err(e) = runtime.engine.check_stuck_processing().await {
                    tracing::error!(error = %e, "Stuck check failed");
                }
            }
            _ = clock.tick() => {
                let now = Utc::now();
                let today = now.format("%Y-%m-%d").to_string();

                if let Some((hour, minute)) = daily_sync {
                    let due = now.hour() == hour && now.minute() == minute;
                    if due && last_sync_day.as_deref() != Some(&today) {
                        last_sync_day = Some(today.clone());
                        match runtime.engine.start_sync(TriggerType::Scheduled).await {
                            Ok(report) => tracing::info!(
                                batch_id = %report.batch_id,
                                successful = report.stats.successful,
                                failed = report.stats.failed,
                                "Scheduled sync finished"
                            ),
                            Err(SyncError::AlreadyRunning) => {
                                tracing::warn!("Scheduled sync skipped, run in progress");
                            }
                            Err(e) => tracing::error!(error = %e, "Scheduled sync failed"),
                        }
                    }
                }

                let (purge_hour, purge_minute) = purge_at;
                let purge_due = now.hour() == purge_hour && now.minute() == purge_minute;
                if purge_due && last_purge_day.as_deref() != Some(&today) {
                    last_purge_day = Some(today.clone());
                    match runtime.store.purge_completed(config.queue.retention_days) {
                        Ok(removed) => tracing::info!(removed, "Retention sweep finished"),
                        Err(e) => tracing::error!(error = %e, "Retention sweep failed"),
                    }
                    if let Err(e) = runtime.engine.send_daily_report().await {
                        tracing::error!(error = %e, "Daily report failed");
                    }
                }
            }
        }
    }
    Ok(())
}

use anyhow::Result;

use storesync_engine::Config;
use storesync_state::QueueStore;

/// Execute the `stats` command: today's activity, weekly aggregates, and
/// run history.
pub fn execute(config: &Config, history: u32) -> Result<()> {
    let store = super::open_store(config)?;

    let queue = store.stats()?;
    println!("Queue:");
    println!(
        "  pending {}  processing {}  completed {}  failed {}  (total {})",
        queue.pending, queue.processing, queue.completed, queue.failed, queue.total
    );

    let today = store.stats_today()?;
    println!("\nToday:");
    println!(
        "  total {}  completed {}  failed {}  success rate {:.2}%",
        today.total, today.completed, today.failed, today.success_rate
    );
    println!(
        "  avg item duration {:.0} ms",
        store.average_recent_duration_ms()?
    );

    let days = store.last_seven_days()?;
    if !days.is_empty() {
        println!("\nLast 7 days:");
        for day in &days {
            println!(
                "  {}  total {:>5}  ok {:>5}  failed {:>5}  avg {} ms",
                day.date, day.total_synced, day.successful, day.failed, day.avg_duration_ms
            );
        }
    }

    let runs = store.history(history)?;
    if !runs.is_empty() {
        println!("\nRecent runs:");
        for run in &runs {
            println!(
                "  {}  {:<9}  total {:>5}  ok {:>5}  failed {:>5}  {} ms",
                run.batch_id, run.trigger_type, run.total, run.successful, run.failed,
                run.duration_ms
            );
        }
    }
    Ok(())
}

use anyhow::Result;

use storesync_engine::Config;
use storesync_state::QueueStore;

/// Execute the `purge` command: retention sweep of completed items.
pub fn execute(config: &Config, days: Option<u32>) -> Result<()> {
    let store = super::open_store(config)?;
    let days = days.unwrap_or(config.queue.retention_days);
    let removed = store.purge_completed(days)?;
    println!("{removed} completed item(s) older than {days} day(s) removed.");
    Ok(())
}

use anyhow::Result;

use storesync_engine::Config;
use storesync_state::QueueStore;

/// Execute the `reap` command: reset items stuck in processing.
pub fn execute(config: &Config) -> Result<()> {
    let store = super::open_store(config)?;
    let timeout = config.queue.stuck_timeout_minutes;

    let stuck = store.find_stuck(timeout)?;
    if stuck.is_empty() {
        println!("No items stuck longer than {timeout} minutes.");
        return Ok(());
    }

    for item in &stuck {
        println!(
            "{:<20} attempts {}/{}  last update {}",
            item.natural_key, item.attempts, item.max_attempts, item.updated_at
        );
    }
    let reset = store.reset_stuck(timeout)?;
    println!("\n{reset} item(s) reset to pending.");
    Ok(())
}

use anyhow::Result;

use storesync_engine::Config;
use storesync_state::QueueStore;

/// Execute the `retry` command: reset failed items to pending.
pub fn execute(config: &Config, key: Option<&str>) -> Result<()> {
    let store = super::open_store(config)?;

    match key {
        Some(key) => {
            if store.retry_single(key)? {
                println!("Item {key} re-queued.");
            } else {
                anyhow::bail!("no failed item with key {key}")
            }
        }
        None => {
            let count = store.retry_failed()?;
            println!("{count} failed item(s) re-queued.");
        }
    }
    Ok(())
}

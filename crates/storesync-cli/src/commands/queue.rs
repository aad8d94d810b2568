use anyhow::Result;

use storesync_engine::Config;
use storesync_state::{QueueFilter, QueueStore};
use storesync_types::ItemStatus;

/// Execute the `queue` command: print one page of the work queue.
pub fn execute(
    config: &Config,
    status: Option<&str>,
    search: Option<String>,
    page: u32,
    per_page: u32,
) -> Result<()> {
    let status = status
        .map(|s| {
            ItemStatus::parse(s).ok_or_else(|| anyhow::anyhow!("unknown status filter: {s}"))
        })
        .transpose()?;

    let store = super::open_store(config)?;
    let result = store.page(&QueueFilter { status, search }, page, per_page)?;

    if result.data.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    println!(
        "{:<20} {:<30} {:<12} {:>8} {:<20}",
        "KEY", "NAME", "STATUS", "ATTEMPTS", "UPDATED"
    );
    for item in &result.data {
        println!(
            "{:<20} {:<30} {:<12} {:>8} {:<20}",
            item.natural_key,
            item.display_name.chars().take(30).collect::<String>(),
            item.status,
            format!("{}/{}", item.attempts, item.max_attempts),
            item.updated_at
        );
        if let Some(error) = &item.last_error {
            println!("  last error: {error}");
        }
    }
    println!(
        "\nPage {}/{} ({} items)",
        result.pagination.page, result.pagination.pages, result.pagination.total
    );
    Ok(())
}

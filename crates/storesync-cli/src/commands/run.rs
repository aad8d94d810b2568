use anyhow::Result;

use storesync_engine::Config;
use storesync_types::TriggerType;

/// Execute the `run` command: one full sync run with a printed summary.
pub async fn execute(config: &Config, scheduled: bool) -> Result<()> {
    let runtime = super::build_runtime(config).await?;
    let trigger = if scheduled {
        TriggerType::Scheduled
    } else {
        TriggerType::Manual
    };

    let report = runtime.engine.start_sync(trigger).await?;

    println!("Batch:      {}", report.batch_id);
    println!("Total:      {}", report.stats.total);
    println!("Successful: {}", report.stats.successful);
    println!("Failed:     {}", report.stats.failed);
    println!("Duration:   {} ms", report.duration_ms);
    if !report.breakdown.is_empty() {
        println!("Unresolved errors (24h):");
        for (kind, count) in &report.breakdown {
            println!("  {kind}: {count}");
        }
    }
    Ok(())
}

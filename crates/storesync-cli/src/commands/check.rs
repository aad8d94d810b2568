use anyhow::Result;

use storesync_engine::{CatalogSource, CatalogWriter, Config, PgCatalogWriter, SourceClient};
use storesync_state::QueueStore;

/// Execute the `check` command: validate config and connectivity.
pub async fn execute(config: &Config) -> Result<()> {
    println!("Config:       OK");

    let store = super::open_store(config)?;
    let stats = store.stats()?;
    println!("Queue store:  OK ({} items)", stats.total);

    let source = SourceClient::new(&config.source)?;
    let source_ok = match source.fetch_catalog().await {
        Ok(records) => {
            println!("Source:       OK ({} records)", records.len());
            true
        }
        Err(e) => {
            println!("Source:       FAILED");
            println!("  {e}");
            false
        }
    };

    let dest_ok = match PgCatalogWriter::connect(&config.destination).await {
        Ok(writer) => match writer.health_check().await {
            Ok(()) => {
                println!("Destination:  OK");
                true
            }
            Err(e) => {
                println!("Destination:  FAILED");
                println!("  {e}");
                false
            }
        },
        Err(e) => {
            println!("Destination:  FAILED");
            println!("  {e}");
            false
        }
    };

    if source_ok && dest_ok {
        println!("\nAll checks passed.");
        Ok(())
    } else {
        anyhow::bail!("One or more checks failed")
    }
}

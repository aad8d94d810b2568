use anyhow::Result;

use storesync_engine::Config;
use storesync_state::QueueStore;

/// Execute the `errors` command: list recent unresolved errors, or mark
/// one resolved.
pub fn execute(config: &Config, hours: u32, resolve: Option<i64>) -> Result<()> {
    let store = super::open_store(config)?;

    if let Some(id) = resolve {
        if store.mark_error_resolved(id)? {
            println!("Error {id} marked resolved.");
        } else {
            anyhow::bail!("no error with id {id}")
        }
        return Ok(());
    }

    let errors = store.recent_errors(hours)?;
    if errors.is_empty() {
        println!("No unresolved errors in the last {hours}h.");
        return Ok(());
    }

    let breakdown = store.error_breakdown(hours)?;
    for (kind, count) in &breakdown {
        println!("{kind}: {count}");
    }
    println!();

    for error in &errors {
        let key = error.natural_key.as_deref().unwrap_or("-");
        println!(
            "#{:<6} {:<22} {:<14} {:<20} {}",
            error.id, error.created_at, error.kind, key, error.message
        );
    }
    Ok(())
}

pub mod check;
pub mod errors;
pub mod purge;
pub mod queue;
pub mod reap;
pub mod retry;
pub mod run;
pub mod stats;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use storesync_engine::{Config, LogNotifier, PgCatalogWriter, SourceClient, SyncEngine};
use storesync_state::SqliteStore;

/// Engine plus a handle on its store, for commands that touch both.
pub struct Runtime {
    pub store: Arc<SqliteStore>,
    pub engine: Arc<SyncEngine>,
}

/// Open the durable queue store from config.
pub fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(Path::new(&config.queue.db_path), config.queue.max_attempts)?;
    Ok(Arc::new(store))
}

/// Wire up store, source, destination, and engine.
pub async fn build_runtime(config: &Config) -> Result<Runtime> {
    let store = open_store(config)?;
    let source = Arc::new(SourceClient::new(&config.source)?);
    let writer = Arc::new(PgCatalogWriter::connect(&config.destination).await?);
    let engine = SyncEngine::new(
        store.clone(),
        source,
        writer,
        Arc::new(LogNotifier),
        config.queue.stuck_timeout_minutes,
    );
    Ok(Runtime {
        store,
        engine: Arc::new(engine),
    })
}

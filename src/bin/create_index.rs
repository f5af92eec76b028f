use anyhow::{Context, Result};
use dotenv::dotenv;
use log::{error, info};

use hackrx_rag::config::INDEX_NAME;
use hackrx_rag::database::{QdrantConfig, QdrantStore, VectorStore};

/// One-time bootstrap: create the shared vector index if it does not exist.
/// Run this before starting the server for the first time; re-running is a
/// no-op.
#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = QdrantConfig::from_env().context("Missing QDRANT_URL")?;
    let store =
        QdrantStore::connect(config, INDEX_NAME).context("Failed to initialize Qdrant client")?;

    if let Err(e) = store.ensure_index().await {
        error!("Failed to set up index '{}': {}", INDEX_NAME, e);
        std::process::exit(1);
    }

    match store.point_count().await {
        Ok(Some(count)) => info!("Index '{}' holds {} points", INDEX_NAME, count),
        Ok(None) => info!("Index '{}' is ready", INDEX_NAME),
        Err(e) => error!("Failed to fetch index stats: {}", e),
    }

    Ok(())
}

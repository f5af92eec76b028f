use anyhow::{Context, Result};
use dotenv::dotenv;
use log::info;

use hackrx_rag::embeddings::{HfConfig, HfEmbeddingsClient, EMBEDDING_MODEL};

/// Cache warming: ask the embedding host to load the model's weights ahead
/// of the first real request, so it does not pay the cold-start cost.
#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = HfConfig::from_env().context("Missing HF_API_KEY")?;
    let client = HfEmbeddingsClient::new(config);

    info!("Warming up embedding model {}", EMBEDDING_MODEL);
    client
        .warm_up()
        .await
        .context("Failed to warm up the embedding model")?;
    info!("Embedding model is loaded and ready");

    Ok(())
}

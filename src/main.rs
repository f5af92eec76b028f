use actix_web::{middleware, web, App, HttpServer};
use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::info;
use std::sync::Arc;

use hackrx_rag::api::{self, AppState};
use hackrx_rag::config::{AppConfig, INDEX_NAME};
use hackrx_rag::database::QdrantStore;
use hackrx_rag::embeddings::HfEmbeddingsClient;
use hackrx_rag::gemini::GeminiClient;
use hackrx_rag::rag::RagEngine;

/// Retrieval-augmented document QA server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Address to bind the HTTP server to (overrides BIND_ADDR)
    #[arg(long)]
    bind: Option<String>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    // Load configuration from environment
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let bind_addr = args.bind.unwrap_or_else(|| config.bind_addr.clone());

    let store = QdrantStore::connect(config.qdrant.clone(), INDEX_NAME)
        .context("Failed to initialize Qdrant client")?;
    let embedder = HfEmbeddingsClient::new(config.embeddings.clone());
    let generator = GeminiClient::new(config.gemini.clone());

    let state = web::Data::new(AppState {
        engine: RagEngine::new(Arc::new(store), Arc::new(embedder), Arc::new(generator)),
        api_key: config.api_key.clone(),
    });

    info!("Serving index '{}' on {}", INDEX_NAME, bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(api::configure_routes)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await?;

    Ok(())
}

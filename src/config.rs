use anyhow::{Context, Result};
use std::env;

use crate::database::QdrantConfig;
use crate::embeddings::HfConfig;
use crate::gemini::GeminiConfig;

/// Name of the shared vector index all documents are upserted into.
pub const INDEX_NAME: &str = "hackrx-documents";

/// Full application configuration, read from the environment once at startup
/// and passed explicitly to each component.
#[derive(Clone)]
pub struct AppConfig {
    pub qdrant: QdrantConfig,
    pub gemini: GeminiConfig,
    pub embeddings: HfConfig,
    /// Static bearer-token secret guarding the HTTP endpoint.
    pub api_key: String,
    pub bind_addr: String,
}

impl AppConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let qdrant = QdrantConfig::from_env().context("Missing QDRANT_URL")?;
        let gemini = GeminiConfig::from_env().context("Missing GEMINI_API_KEY")?;
        let embeddings = HfConfig::from_env().context("Missing HF_API_KEY")?;
        let api_key = env::var("HACKRX_API_KEY").context("Missing HACKRX_API_KEY")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());

        Ok(AppConfig {
            qdrant,
            gemini,
            embeddings,
            api_key,
            bind_addr,
        })
    }
}

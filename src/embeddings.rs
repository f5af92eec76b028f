use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;

use crate::error::{ServiceError, ServiceResult};

/// Output dimensionality of the embedding model. The vector index is created
/// with the same size at bootstrap; the two must stay in lockstep.
pub const EMBEDDING_DIM: usize = 384;

/// Hosted model used for all embeddings.
pub const EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

const DEFAULT_EMBEDDINGS_URL: &str =
    "https://api-inference.huggingface.co/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2";

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Embedding {
    pub values: Vec<f32>,
}

/// Maps text to a fixed-dimension vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> ServiceResult<Embedding>;
}

/// Configuration for the HuggingFace Inference API
#[derive(Clone)]
pub struct HfConfig {
    pub api_key: String,
    pub embeddings_url: String,
}

impl HfConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = env::var("HF_API_KEY")?;
        let embeddings_url = env::var("HF_EMBEDDINGS_URL")
            .unwrap_or_else(|_| DEFAULT_EMBEDDINGS_URL.to_string());

        Ok(HfConfig {
            api_key,
            embeddings_url,
        })
    }
}

/// Client for the hosted embedding model
#[derive(Clone)]
pub struct HfEmbeddingsClient {
    config: HfConfig,
    client: reqwest::Client,
}

impl HfEmbeddingsClient {
    /// Create a new embeddings client
    pub fn new(config: HfConfig) -> Self {
        let client = reqwest::Client::new();
        HfEmbeddingsClient { config, client }
    }

    async fn request_embedding(&self, text: &str, wait_for_model: bool) -> ServiceResult<Embedding> {
        let request = json!({
            "inputs": [text],
            "options": { "wait_for_model": wait_for_model },
        });

        let response = self
            .client
            .post(&self.config.embeddings_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::Provider(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ServiceError::Provider(format!(
                "embedding request failed: {status} {error_text}"
            )));
        }

        // The feature-extraction pipeline returns one vector per input.
        let mut vectors: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| ServiceError::Provider(format!("invalid embedding response: {e}")))?;

        if vectors.is_empty() {
            return Err(ServiceError::Provider(
                "embedding response contained no vectors".to_string(),
            ));
        }

        Ok(Embedding {
            values: vectors.swap_remove(0),
        })
    }

    /// Issue a probe request so the hosted model's weights are loaded before
    /// the first real request.
    pub async fn warm_up(&self) -> ServiceResult<()> {
        self.request_embedding("warm-up", true).await?;
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for HfEmbeddingsClient {
    async fn embed(&self, text: &str) -> ServiceResult<Embedding> {
        self.request_embedding(text, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HfEmbeddingsClient {
        HfEmbeddingsClient::new(HfConfig {
            api_key: "test-key".to_string(),
            embeddings_url: format!("{}/embed", server.uri()),
        })
    }

    #[tokio::test]
    async fn embed_returns_the_model_vector() {
        let server = MockServer::start().await;
        let vector: Vec<f32> = (0..EMBEDDING_DIM).map(|i| i as f32 / 100.0).collect();
        Mock::given(method("POST"))
            .and(path("/embed"))
            .and(body_partial_json(json!({ "inputs": ["hello"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([vector])))
            .mount(&server)
            .await;

        let embedding = client_for(&server).embed("hello").await.unwrap();
        assert_eq!(embedding.values.len(), EMBEDDING_DIM);
        assert_eq!(embedding.values[1], 0.01);
    }

    #[tokio::test]
    async fn embed_surfaces_provider_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let result = client_for(&server).embed("hello").await;
        assert!(matches!(result, Err(ServiceError::Provider(_))));
    }

    #[tokio::test]
    async fn warm_up_asks_the_host_to_load_the_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .and(body_partial_json(
                json!({ "options": { "wait_for_model": true } }),
            ))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([vec![0.0f32; EMBEDDING_DIM]])),
            )
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).warm_up().await.unwrap();
    }
}

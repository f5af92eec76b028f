use async_trait::async_trait;
use log::info;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, UpsertPointsBuilder, Value, VectorParams,
};
use qdrant_client::Qdrant;
use serde_json::json;
use std::collections::HashMap;
use std::env;
use uuid::Uuid;

use crate::chunking::TextChunk;
use crate::embeddings::{Embedding, EMBEDDING_DIM};
use crate::error::{ServiceError, ServiceResult};

/// Persists chunk vectors and retrieves the nearest neighbours of a query.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the index if it is missing. Safe to call repeatedly.
    async fn ensure_index(&self) -> ServiceResult<()>;

    /// Insert chunk/embedding pairs under fresh ids. Prior entries are never
    /// deleted or deduplicated, so re-ingesting a document duplicates them.
    async fn upsert_chunks(
        &self,
        chunks: Vec<TextChunk>,
        embeddings: Vec<Embedding>,
    ) -> ServiceResult<()>;

    /// Return the stored chunks most similar to the query embedding.
    async fn search(&self, query: Embedding, limit: u64) -> ServiceResult<Vec<TextChunk>>;
}

/// Configuration for Qdrant
#[derive(Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
}

impl QdrantConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let url = env::var("QDRANT_URL")?;
        let api_key = env::var("QDRANT_API_KEY").ok();

        Ok(QdrantConfig { url, api_key })
    }
}

/// Qdrant-backed vector store bound to one named collection
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
}

impl QdrantStore {
    /// Connect to Qdrant
    pub fn connect(config: QdrantConfig, collection: &str) -> ServiceResult<Self> {
        let builder = Qdrant::from_url(&config.url);
        let builder = if let Some(api_key) = config.api_key {
            builder.api_key(api_key)
        } else {
            builder
        };

        let client = builder
            .build()
            .map_err(|e| ServiceError::Provider(format!("failed to connect to Qdrant: {e}")))?;

        Ok(QdrantStore {
            client,
            collection: collection.to_string(),
        })
    }

    /// Check if the collection exists
    async fn collection_exists(&self) -> ServiceResult<bool> {
        match self.client.collection_info(&self.collection).await {
            Ok(_) => Ok(true),
            Err(qdrant_client::QdrantError::ResponseError { status })
                if status.code() == tonic::Code::NotFound =>
            {
                Ok(false)
            }
            Err(e) => Err(ServiceError::Provider(format!(
                "failed to check collection existence: {e}"
            ))),
        }
    }

    /// Number of points currently stored, if the store reports it.
    pub async fn point_count(&self) -> ServiceResult<Option<u64>> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| ServiceError::Provider(format!("failed to fetch collection info: {e}")))?;

        Ok(info.result.and_then(|r| r.points_count))
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_index(&self) -> ServiceResult<()> {
        if self.collection_exists().await? {
            info!("Collection '{}' already exists", self.collection);
            return Ok(());
        }

        info!(
            "Creating collection '{}' with dimension {}",
            self.collection, EMBEDDING_DIM
        );

        let create_collection = CreateCollectionBuilder::new(self.collection.clone())
            .vectors_config(VectorParams {
                size: EMBEDDING_DIM as u64,
                distance: Distance::Cosine.into(),
                ..Default::default()
            });

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| {
                ServiceError::Provider(format!(
                    "failed to create collection {}: {e}",
                    self.collection
                ))
            })?;

        Ok(())
    }

    async fn upsert_chunks(
        &self,
        chunks: Vec<TextChunk>,
        embeddings: Vec<Embedding>,
    ) -> ServiceResult<()> {
        // Fresh UUIDs per upsert: re-ingesting the same document must add
        // points rather than overwrite the previous ones.
        let points: Vec<PointStruct> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(idx, (chunk, embedding))| {
                let payload: HashMap<String, Value> = serde_json::from_value(json!({
                    "text": chunk.text,
                    "source": chunk.source,
                    "page": chunk.page,
                    "chunk_index": idx,
                }))
                .unwrap();

                PointStruct::new(Uuid::new_v4().to_string(), embedding.values, payload)
            })
            .collect();

        let upsert_request = UpsertPointsBuilder::new(self.collection.clone(), points).build();

        self.client.upsert_points(upsert_request).await.map_err(|e| {
            ServiceError::Provider(format!(
                "failed to upsert points into {}: {e}",
                self.collection
            ))
        })?;

        Ok(())
    }

    async fn search(&self, query: Embedding, limit: u64) -> ServiceResult<Vec<TextChunk>> {
        use qdrant_client::qdrant::{with_payload_selector, SearchPoints, WithPayloadSelector};

        let search_request = SearchPoints {
            collection_name: self.collection.clone(),
            vector: query.values,
            limit,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(with_payload_selector::SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let search_response = self.client.search_points(search_request).await.map_err(|e| {
            ServiceError::Provider(format!("failed to search {}: {e}", self.collection))
        })?;

        let chunks = search_response
            .result
            .into_iter()
            .filter_map(|scored_point| {
                let payload = scored_point.payload;
                let text = payload.get("text")?.as_str()?.to_string();
                let source = payload
                    .get("source")
                    .and_then(|v| v.as_str())
                    .map(String::as_str)
                    .unwrap_or_default()
                    .to_string();
                let page = payload
                    .get("page")
                    .and_then(|v| v.as_integer())
                    .unwrap_or(0) as usize;

                Some(TextChunk { text, source, page })
            })
            .collect();

        Ok(chunks)
    }
}

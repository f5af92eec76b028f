use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{ServiceError, ServiceResult};

/// Model used for answer generation.
pub const GENERATION_MODEL: &str = "models/gemini-1.5-flash";

const GENERATION_TEMPERATURE: f32 = 0.7;

const DEFAULT_GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

/// Produces a free-text answer from a question and retrieved context.
///
/// `Ok(None)` means the model returned no usable candidate; the caller
/// decides on a fallback.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> ServiceResult<Option<String>>;
}

/// Configuration for Gemini API
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub generate_url: String,
}

impl GeminiConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = env::var("GEMINI_API_KEY")?;
        let generate_url =
            env::var("GEMINI_GENERATE_URL").unwrap_or_else(|_| DEFAULT_GENERATE_URL.to_string());

        Ok(GeminiConfig {
            api_key,
            generate_url,
        })
    }
}

/// Client for interacting with Gemini API
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Self {
        let client = reqwest::Client::new();
        GeminiClient { config, client }
    }

    /// Generate text using Gemini model
    async fn generate_text(&self, prompt: &str) -> ServiceResult<Option<String>> {
        let request = GenerateRequest {
            model: GENERATION_MODEL,
            contents: vec![Content::new_with_role(prompt, "user")],
            generation_config: GenerationConfig {
                temperature: GENERATION_TEMPERATURE,
                top_p: 0.8,
                top_k: 40,
                max_output_tokens: 1024,
            },
        };

        let url = format!("{}?key={}", self.config.generate_url, self.config.api_key);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::Provider(format!("generation request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ServiceError::Provider(format!(
                "generation request failed: {status} {error_text}"
            )));
        }

        let response_data: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Provider(format!("invalid generation response: {e}")))?;

        // Extract the generated text from the response
        Ok(response_data
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text))
    }
}

#[async_trait]
impl GenerativeProvider for GeminiClient {
    async fn answer(&self, question: &str, context: &str) -> ServiceResult<Option<String>> {
        let prompt = format!("Context: {}\n\nQuestion: {}", context, question);
        self.generate_text(&prompt).await
    }
}

// Request/response structures for the Gemini API

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    model: &'static str,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
    role: &'static str,
}

impl<'a> Content<'a> {
    fn new_with_role(text: &'a str, role: &'static str) -> Self {
        Content {
            parts: vec![Part { text }],
            role,
        }
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize, Debug)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: String,
}

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy for the service.
///
/// Internally each kind carries the source detail for logging; the HTTP
/// surface collapses every non-auth kind into one generic server error.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing, malformed, or mismatched bearer token.
    #[error("invalid API key")]
    Auth,
    /// The document could not be fetched (bad URL, network error, non-2xx).
    #[error("failed to retrieve document: {0}")]
    Retrieval(String),
    /// The document could not be parsed (corrupt or unsupported format).
    #[error("failed to parse document: {0}")]
    Parse(String),
    /// An external provider call failed (embeddings, vector store, generation).
    #[error("provider request failed: {0}")]
    Provider(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Auth => StatusCode::FORBIDDEN,
            ServiceError::Retrieval(_) | ServiceError::Parse(_) | ServiceError::Provider(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let detail = match self {
            ServiceError::Auth => "Invalid API Key",
            // Callers cannot distinguish retrieval, parse, and provider
            // failures; the detail stays in the server log only.
            _ => "An internal server error occurred.",
        };

        HttpResponse::build(self.status_code()).json(json!({ "detail": detail }))
    }
}

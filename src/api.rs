use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};
use crate::rag::RagEngine;

/// Expected JSON structure for incoming requests
#[derive(Debug, Deserialize)]
pub struct QueryPayload {
    /// URL of the document to index
    pub documents: String,
    pub questions: Vec<String>,
}

/// JSON structure for the response
#[derive(Debug, Serialize)]
pub struct AnswerPayload {
    pub answers: Vec<String>,
}

/// Shared per-process state handed to every request handler.
pub struct AppState {
    pub engine: RagEngine,
    /// Configured bearer-token secret.
    pub api_key: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/hackrx").route("/run", web::post().to(run)));
}

/// Main endpoint: index the document at the given URL, then answer each
/// question over the retrieved context.
pub async fn run(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<QueryPayload>,
) -> ServiceResult<HttpResponse> {
    verify_api_key(&req, &state.api_key)?;

    info!(
        "Processing {} questions for {}",
        payload.questions.len(),
        payload.documents
    );

    let answers = state
        .engine
        .run(&payload.documents, &payload.questions)
        .await?;

    Ok(HttpResponse::Ok().json(AnswerPayload { answers }))
}

/// Verify the Bearer token in the Authorization header.
fn verify_api_key(req: &HttpRequest, expected: &str) -> ServiceResult<()> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ServiceError::Auth)?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or(ServiceError::Auth)?;

    if constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(ServiceError::Auth)
    }
}

/// Compare two byte strings without an early exit on the first mismatch, so
/// the comparison time does not leak how much of the secret matched.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

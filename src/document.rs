use log::{debug, info, warn};
use mime_guess::from_path;
use pdf_extract::extract_text;
use reqwest::header::CONTENT_TYPE;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{ServiceError, ServiceResult};

/// Page separator emitted by the PDF extractor.
const PAGE_BREAK: char = '\x0c';

/// A downloaded document, parsed into page-level text units.
#[derive(Debug, Clone)]
pub struct Document {
    /// Extracted text, one entry per page
    pub pages: Vec<String>,
    /// The URL the document was fetched from (used as provenance metadata)
    pub source_url: String,
    /// The document's MIME type
    pub mime_type: String,
}

impl Document {
    /// Fetch a document over HTTP and parse it into page texts.
    ///
    /// The body is staged in a scoped temporary file for parsing; the file
    /// is removed when the handle drops, on every exit path.
    pub async fn fetch(client: &reqwest::Client, url: &str) -> ServiceResult<Self> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| ServiceError::Retrieval(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Retrieval(format!(
                "{url} returned HTTP {status}"
            )));
        }

        let header_mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let mime_type = detect_mime(header_mime.as_deref(), url);
        debug!("Detected MIME type: {}", mime_type);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Retrieval(format!("failed to read body of {url}: {e}")))?;

        let mut temp_file = NamedTempFile::new()
            .map_err(|e| ServiceError::Retrieval(format!("failed to stage document: {e}")))?;
        temp_file
            .write_all(&bytes)
            .map_err(|e| ServiceError::Retrieval(format!("failed to stage document: {e}")))?;

        let pages = parse_file(temp_file.path(), &mime_type)?;

        Ok(Document {
            pages,
            source_url: url.to_string(),
            mime_type,
        })
    }
}

/// Resolve the document MIME type from the response header, falling back to
/// a guess from the URL's file extension.
pub fn detect_mime(content_type: Option<&str>, url: &str) -> String {
    if let Some(header) = content_type {
        // Strip any "; charset=..." parameter.
        let essence = header.split(';').next().unwrap_or(header).trim();
        if !essence.is_empty() && essence != "application/octet-stream" {
            return essence.to_string();
        }
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    from_path(path).first_or_octet_stream().to_string()
}

/// Read content from a document based on its MIME type
pub fn parse_file(path: &Path, mime_type: &str) -> ServiceResult<Vec<String>> {
    match mime_type {
        // Handle PDF documents
        mime if mime.starts_with("application/pdf") => {
            info!("Parsing PDF document");
            let content = extract_text(path)
                .map_err(|e| ServiceError::Parse(format!("failed to extract PDF text: {e}")))?;

            let pages = split_page_breaks(&content);
            if pages.is_empty() {
                warn!("Extracted PDF content is empty or contains only whitespace");
            }

            Ok(pages)
        }

        // Handle plain text documents
        mime if mime.starts_with("text/") => {
            info!("Parsing text document");
            let content = fs::read_to_string(path)
                .map_err(|e| ServiceError::Parse(format!("failed to read text document: {e}")))?;
            Ok(split_page_breaks(&content))
        }

        // Unsupported format
        _ => Err(ServiceError::Parse(format!(
            "unsupported document format: {mime_type}. Only text and PDF documents are supported."
        ))),
    }
}

/// Split extracted text into page units on form-feed separators, normalizing
/// whitespace in each unit. Text with no separator is a single unit.
fn split_page_breaks(text: &str) -> Vec<String> {
    text.split(PAGE_BREAK)
        .map(normalize_whitespace)
        .filter(|page| !page.is_empty())
        .collect()
}

/// Normalize whitespace in text (remove multiple consecutive spaces, newlines, etc.)
fn normalize_whitespace(text: &str) -> String {
    let result = text.replace('\r', "");

    // Replace runs of newlines with at most a paragraph break
    let mut prev_char = ' ';
    let mut newline_count = 0;
    let mut normalized = String::with_capacity(result.len());

    for c in result.chars() {
        if c == '\n' {
            newline_count += 1;
        } else {
            if newline_count > 0 {
                if newline_count >= 2 {
                    normalized.push_str("\n\n");
                } else {
                    normalized.push('\n');
                }
                newline_count = 0;
            }

            // Don't add consecutive spaces
            if !(c == ' ' && prev_char == ' ') {
                normalized.push(c);
            }

            prev_char = c;
        }
    }

    if newline_count > 0 {
        if newline_count >= 2 {
            normalized.push_str("\n\n");
        } else {
            normalized.push('\n');
        }
    }

    normalized.trim().to_string()
}

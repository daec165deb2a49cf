//! HTTP client for the stem processing service.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ArchivePayload, FileUpload, ProcessingBackend, CACHE_KEY_HEADER, TITLE_HEADER};
use crate::error::LibraryError;

/// reqwest-backed processing service client
#[derive(Debug, Clone)]
pub struct HttpBackend {
    /// Base URL without trailing slash
    base_url: String,
    client: reqwest::Client,
}

/// Listing returned by `/youtube/extracted`
#[derive(Debug, Deserialize)]
struct ExtractedListing {
    #[serde(default)]
    title: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Read archive bytes from a successful response, or the error payload
    async fn archive_response(response: Response) -> Result<ArchivePayload, LibraryError> {
        let response = ensure_success(response).await?;

        let title = header_value(response.headers(), TITLE_HEADER);
        let cache_key = header_value(response.headers(), CACHE_KEY_HEADER);
        let bytes = response.bytes().await?.to_vec();

        debug!(bytes = bytes.len(), ?title, ?cache_key, "Received archive");
        Ok(ArchivePayload {
            bytes,
            title,
            cache_key,
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Render an error body into a short detail string.
///
/// JSON bodies with a `detail` field use that field; other JSON is kept
/// verbatim; plain text is trimmed.
pub fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => match value.get("detail") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(detail) => Some(detail.to_string()),
            None => Some(value.to_string()),
        },
        Err(_) => Some(body.to_string()),
    }
}

async fn ensure_success(response: Response) -> Result<Response, LibraryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = error_detail(&body);
    warn!(status = status.as_u16(), ?detail, "Backend rejected request");

    Err(LibraryError::Backend {
        status: status.as_u16(),
        detail,
    })
}

#[async_trait]
impl ProcessingBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit_link(&self, url: &str) -> Result<ArchivePayload, LibraryError> {
        let response = self
            .client
            .post(self.endpoint("youtube"))
            .json(&serde_json::json!({ "youtube_url": url }))
            .send()
            .await?;

        Self::archive_response(response).await
    }

    async fn lookup_title(&self, url: &str) -> Result<Option<String>, LibraryError> {
        let response = self
            .client
            .post(self.endpoint("youtube/extracted"))
            .json(&serde_json::json!({ "youtube_url": url }))
            .send()
            .await?;
        let response = ensure_success(response).await?;

        if let Some(title) = header_value(response.headers(), TITLE_HEADER) {
            return Ok(Some(title));
        }

        // Listing body is optional; an unparseable one just means no title
        let listing: Option<ExtractedListing> = response.json().await.ok();
        Ok(listing
            .and_then(|l| l.title)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    async fn upload_file(&self, upload: &FileUpload) -> Result<ArchivePayload, LibraryError> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(upload.mime())?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        Self::archive_response(response).await
    }

    async fn fetch_cached(&self, cache_key: &str) -> Result<ArchivePayload, LibraryError> {
        let response = self
            .client
            .get(self.endpoint(&format!("cache/{}", cache_key)))
            .send()
            .await?;

        Self::archive_response(response).await
    }
}

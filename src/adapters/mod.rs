//! Adapter interfaces for the external processing service.
//!
//! The service separates stems and answers with a ZIP archive. The store
//! only talks to it through [`ProcessingBackend`], so tests can swap in
//! an in-memory fake.

pub mod http;

use std::path::Path;

use async_trait::async_trait;

use crate::blobs::mime_for;
use crate::error::LibraryError;

pub use http::HttpBackend;

/// Header carrying a human-readable title
pub const TITLE_HEADER: &str = "x-video-title";

/// Header carrying a cache token for later re-fetch
pub const CACHE_KEY_HEADER: &str = "x-cache-key";

/// Archive bytes plus the metadata headers that came with them
#[derive(Debug, Clone, Default)]
pub struct ArchivePayload {
    pub bytes: Vec<u8>,

    /// Backend-suggested title
    pub title: Option<String>,

    /// Token for `GET /cache/{key}`
    pub cache_key: Option<String>,
}

impl ArchivePayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            title: None,
            cache_key: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }
}

/// A local file ready to upload
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping its base name
    pub async fn from_path(path: &Path) -> Result<Self, LibraryError> {
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let bytes = tokio::fs::read(path).await?;
        Ok(Self { file_name, bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime(&self) -> &'static str {
        mime_for(&self.file_name)
    }
}

/// Client of the stem processing service
#[async_trait]
pub trait ProcessingBackend: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Submit a remote link (`POST /youtube`)
    async fn submit_link(&self, url: &str) -> Result<ArchivePayload, LibraryError>;

    /// Best-effort title lookup (`POST /youtube/extracted`)
    async fn lookup_title(&self, url: &str) -> Result<Option<String>, LibraryError>;

    /// Upload a local file (`POST /upload`)
    async fn upload_file(&self, upload: &FileUpload) -> Result<ArchivePayload, LibraryError>;

    /// Re-fetch a previously computed archive (`GET /cache/{key}`)
    async fn fetch_cached(&self, cache_key: &str) -> Result<ArchivePayload, LibraryError>;
}

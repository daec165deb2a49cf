//! Library entries and their identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::layers::LayerInfo;
use super::source::SourceRef;
use crate::blobs::BlobHandle;

/// Entry identifier (milliseconds since epoch at creation)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(String);

impl EntryId {
    /// Build an id from a millisecond timestamp
    pub fn from_millis(millis: i64) -> Self {
        Self(millis.to_string())
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value, if the id was time-derived
    pub fn millis(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::str::FromStr for EntryId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().to_string()))
    }
}

/// One extracted archive member.
///
/// Only `filename` is persisted. The handle lives as long as the process
/// and must be re-derived after a reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFile {
    /// Path within the archive
    pub filename: String,

    /// In-memory handle for playback/download
    #[serde(skip)]
    pub handle: Option<BlobHandle>,
}

impl ExtractedFile {
    pub fn new(filename: impl Into<String>, handle: BlobHandle) -> Self {
        Self {
            filename: filename.into(),
            handle: Some(handle),
        }
    }

    /// Base name without any archive directory prefix
    pub fn display_name(&self) -> &str {
        self.filename
            .rsplit('/')
            .next()
            .unwrap_or(&self.filename)
    }
}

/// A processed source tracked by the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub id: EntryId,

    /// Remote link or uploaded file
    pub source: SourceRef,

    /// Display name
    pub title: String,

    /// Preview image URL (link entries only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    pub added_at: DateTime<Utc>,

    /// Advisory visualization layers
    #[serde(default)]
    pub layers: Vec<LayerInfo>,

    #[serde(default)]
    pub extracted_files: Vec<ExtractedFile>,

    /// Backend token for re-fetching the archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,

    #[serde(default)]
    pub processed: bool,
}

impl LibraryEntry {
    /// Whether every extracted file currently holds a handle
    pub fn has_handles(&self) -> bool {
        !self.extracted_files.is_empty() && self.extracted_files.iter().all(|f| f.handle.is_some())
    }

    /// All handles owned by this entry
    pub fn handles(&self) -> impl Iterator<Item = &BlobHandle> {
        self.extracted_files.iter().filter_map(|f| f.handle.as_ref())
    }

    /// Drop every handle reference (the registry must be revoked separately)
    pub fn take_handles(&mut self) -> Vec<BlobHandle> {
        self.extracted_files
            .iter_mut()
            .filter_map(|f| f.handle.take())
            .collect()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.extracted_files.iter().map(|f| f.filename.as_str())
    }
}

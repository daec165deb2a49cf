//! Process-lifetime binary handles.
//!
//! Extracted stems are registered here and addressed by a [`BlobHandle`].
//! Handles are never persisted: once revoked, or once the process exits,
//! the bytes are gone and must be re-fetched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque reference to registered bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobHandle(Uuid);

impl std::fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "blob:stemshelf/{}", self.0)
    }
}

/// Registered bytes with their guessed MIME type
#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Arc<Vec<u8>>,
    pub mime: &'static str,
}

impl Blob {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Guess a MIME type from a file extension
pub fn mime_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "json" => "application/json",
        "txt" => "text/plain",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Registry of live handles, shared across clones
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    blobs: Arc<Mutex<HashMap<Uuid, Blob>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Blob>> {
        // Poisoned lock still guards a consistent map
        self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register bytes and return a fresh handle
    pub fn create(&self, bytes: Vec<u8>, filename: &str) -> BlobHandle {
        let id = Uuid::new_v4();
        let blob = Blob {
            bytes: Arc::new(bytes),
            mime: mime_for(filename),
        };
        self.lock().insert(id, blob);
        BlobHandle(id)
    }

    /// Look up a handle; `None` once revoked
    pub fn resolve(&self, handle: &BlobHandle) -> Option<Blob> {
        self.lock().get(&handle.0).cloned()
    }

    /// Release a handle. Returns whether it was still registered.
    pub fn revoke(&self, handle: &BlobHandle) -> bool {
        self.lock().remove(&handle.0).is_some()
    }

    /// Release several handles, returning how many were live
    pub fn revoke_all<'a>(&self, handles: impl IntoIterator<Item = &'a BlobHandle>) -> usize {
        let mut blobs = self.lock();
        handles
            .into_iter()
            .filter(|h| blobs.remove(&h.0).is_some())
            .count()
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

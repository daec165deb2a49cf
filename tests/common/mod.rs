//! Shared fixtures: an in-memory processing backend and ZIP builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stemshelf::library::{KeyValueStorage, MemoryStorage};
use stemshelf::{
    ArchivePayload, BlobRegistry, FileUpload, LibraryError, LibraryStore, ProcessingBackend,
    StoreSettings,
};
use zip::write::SimpleFileOptions;

/// Build a ZIP archive from directory names and (path, bytes) members
pub fn build_zip(dirs: &[&str], files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for dir in dirs {
        writer.add_directory(*dir, options).unwrap();
    }
    for (name, data) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A typical separation result nested under a song folder
pub fn stems_zip() -> Vec<u8> {
    build_zip(
        &["song/"],
        &[
            ("song/vocals.wav", b"vocals-bytes"),
            ("song/drums.wav", b"drums-bytes"),
            ("song/bass.wav", b"bass-bytes"),
        ],
    )
}

#[derive(Debug, Clone)]
enum Failure {
    Network,
    Backend { status: u16, detail: Option<String> },
}

/// In-memory processing service
#[derive(Default)]
pub struct FakeBackend {
    links: Mutex<HashMap<String, ArchivePayload>>,
    cached: Mutex<HashMap<String, ArchivePayload>>,
    upload: Mutex<Option<ArchivePayload>>,
    titles: Mutex<HashMap<String, String>>,
    failure: Mutex<Option<Failure>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_link(&self, url: &str, payload: ArchivePayload) {
        self.links.lock().unwrap().insert(url.to_string(), payload);
    }

    pub fn with_cached(&self, key: &str, payload: ArchivePayload) {
        self.cached.lock().unwrap().insert(key.to_string(), payload);
    }

    pub fn with_upload(&self, payload: ArchivePayload) {
        *self.upload.lock().unwrap() = Some(payload);
    }

    pub fn with_title(&self, url: &str, title: &str) {
        self.titles
            .lock()
            .unwrap()
            .insert(url.to_string(), title.to_string());
    }

    pub fn fail_network(&self) {
        *self.failure.lock().unwrap() = Some(Failure::Network);
    }

    pub fn fail_backend(&self, status: u16, detail: Option<&str>) {
        *self.failure.lock().unwrap() = Some(Failure::Backend {
            status,
            detail: detail.map(str::to_string),
        });
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self, call: String) -> Result<(), LibraryError> {
        self.calls.lock().unwrap().push(call);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.lock().unwrap().clone();
        match failure {
            Some(Failure::Network) => Err(LibraryError::Network("connection refused".into())),
            Some(Failure::Backend { status, detail }) => {
                Err(LibraryError::Backend { status, detail })
            }
            None => Ok(()),
        }
    }

    fn not_found() -> LibraryError {
        LibraryError::Backend {
            status: 404,
            detail: Some("unknown".into()),
        }
    }
}

#[async_trait]
impl ProcessingBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn submit_link(&self, url: &str) -> Result<ArchivePayload, LibraryError> {
        self.enter(format!("submit:{}", url)).await?;
        self.links
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(Self::not_found)
    }

    async fn lookup_title(&self, url: &str) -> Result<Option<String>, LibraryError> {
        self.enter(format!("title:{}", url)).await?;
        match self.titles.lock().unwrap().get(url) {
            Some(title) => Ok(Some(title.clone())),
            None => Err(LibraryError::Network("lookup unavailable".into())),
        }
    }

    async fn upload_file(&self, upload: &FileUpload) -> Result<ArchivePayload, LibraryError> {
        self.enter(format!("upload:{}", upload.file_name)).await?;
        self.upload.lock().unwrap().clone().ok_or_else(Self::not_found)
    }

    async fn fetch_cached(&self, cache_key: &str) -> Result<ArchivePayload, LibraryError> {
        self.enter(format!("cache:{}", cache_key)).await?;
        self.cached
            .lock()
            .unwrap()
            .get(cache_key)
            .cloned()
            .ok_or_else(Self::not_found)
    }
}

/// A store wired to fakes, with handles to inspect them
pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub storage: Arc<MemoryStorage>,
    pub blobs: BlobRegistry,
    pub store: LibraryStore,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()))
    }

    pub fn with_storage(storage: Arc<MemoryStorage>) -> Self {
        Self::with_settings(storage, StoreSettings::default())
    }

    pub fn with_settings(storage: Arc<MemoryStorage>, settings: StoreSettings) -> Self {
        let backend = FakeBackend::new();
        let blobs = BlobRegistry::new();
        let store = LibraryStore::open(backend.clone(), storage.clone(), blobs.clone(), settings);
        Self {
            backend,
            storage,
            blobs,
            store,
        }
    }

    /// Simulate a reload: same backend and storage, fresh handles
    pub fn reload(&self) -> Self {
        let blobs = BlobRegistry::new();
        let store = LibraryStore::open(
            self.backend.clone(),
            self.storage.clone(),
            blobs.clone(),
            self.store.settings().clone(),
        );
        Self {
            backend: self.backend.clone(),
            storage: self.storage.clone(),
            blobs,
            store,
        }
    }

    pub fn persisted(&self) -> Option<String> {
        self.storage
            .get_item(stemshelf::library::LIBRARY_STORAGE_KEY)
            .unwrap()
    }
}

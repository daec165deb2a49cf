//! The library store.
//!
//! Owns the list of processed entries, persists it after every change,
//! mediates archive retrieval, and implements undo-able delete and clear.
//! A store is opened once per session and shut down on sign-out; clones
//! share the same state.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::pending::{spawn_expiry, EntryLifecycle, PendingClear, PendingDeletion};
use super::persist::{load_entries, save_entries};
use super::storage::KeyValueStorage;
use crate::adapters::{ArchivePayload, FileUpload, ProcessingBackend};
use crate::archive::{self, find_member, ArchiveFile};
use crate::blobs::{BlobHandle, BlobRegistry};
use crate::domain::{
    generate_layers, thumbnail_for_link, EntryId, ExtractedFile, LibraryEntry, SourceRef,
};
use crate::error::LibraryError;

/// Store settings resolved from configuration
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Where downloaded stems are saved
    pub download_dir: PathBuf,

    /// Default undo window for deletes and clears
    pub grace_window: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            download_dir: std::env::temp_dir().join("stemshelf-downloads"),
            grace_window: Duration::from_secs(5),
        }
    }
}

/// Result of a download that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// File written to this path
    Saved(PathBuf),

    /// Caller aborted before the file was written
    Cancelled,
}

#[derive(Default)]
struct StoreState {
    /// Live entries, newest first
    entries: Vec<LibraryEntry>,
    pending: HashMap<EntryId, PendingDeletion>,
    pending_clear: Option<PendingClear>,
    last_id: i64,
    generation: u64,
}

impl StoreState {
    fn id_in_use(&self, millis: i64) -> bool {
        let id = EntryId::from_millis(millis);
        self.entries.iter().any(|e| e.id == id)
            || self.pending.contains_key(&id)
            || self
                .pending_clear
                .as_ref()
                .is_some_and(|c| c.entries.iter().any(|e| e.id == id))
    }

    /// Next time-derived id, bumped past any id still in use
    fn next_id(&mut self) -> EntryId {
        let mut candidate = Utc::now().timestamp_millis().max(self.last_id + 1);
        while self.id_in_use(candidate) {
            candidate += 1;
        }
        self.last_id = candidate;
        EntryId::from_millis(candidate)
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn position(&self, id: &EntryId) -> Option<usize> {
        self.entries.iter().position(|e| &e.id == id)
    }
}

struct Inner {
    backend: Arc<dyn ProcessingBackend>,
    storage: Arc<dyn KeyValueStorage>,
    blobs: BlobRegistry,
    settings: StoreSettings,
    state: Mutex<StoreState>,
}

impl Inner {
    /// Best-effort write; failures are logged and in-memory state stays authoritative
    fn persist(&self, entries: &[LibraryEntry]) {
        if let Err(e) = save_entries(self.storage.as_ref(), entries) {
            warn!(error = %e, entries = entries.len(), "Failed to persist library");
        }
    }

    fn release(&self, entry: &mut LibraryEntry) {
        let handles = entry.take_handles();
        let released = self.blobs.revoke_all(handles.iter());
        debug!(id = %entry.id, released, "Released entry handles");
    }

    async fn finalize_removal(&self, id: &EntryId, generation: u64) {
        let mut state = self.state.lock().await;

        let current = state
            .pending
            .get(id)
            .is_some_and(|p| p.generation == generation);
        if !current {
            return;
        }

        if let Some(mut pending) = state.pending.remove(id) {
            self.release(&mut pending.entry);
            info!(id = %id, "Deletion finalized");
        }
    }

    async fn finalize_clear(&self, generation: u64) {
        let mut state = self.state.lock().await;

        let current = state
            .pending_clear
            .as_ref()
            .is_some_and(|c| c.generation == generation);
        if !current {
            return;
        }

        if let Some(mut cleared) = state.pending_clear.take() {
            for entry in cleared.entries.iter_mut() {
                self.release(entry);
            }
            info!(entries = cleared.entries.len(), "Clear finalized");
        }
    }
}

/// Library of processed entries
#[derive(Clone)]
pub struct LibraryStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for LibraryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryStore")
            .field("backend", &self.inner.backend.name())
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

fn placeholder_title() -> String {
    format!("Untitled session {:04}", rand::thread_rng().gen_range(0..10_000))
}

fn base_name(filename: &str) -> String {
    filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .find(|s| !s.is_empty())
        .unwrap_or("download")
        .to_string()
}

/// `dir/name`, or `dir/stem (n).ext` if that already exists
fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    let ext = as_path.extension().map(|e| e.to_string_lossy().to_string());

    (1..)
        .map(|n| match &ext {
            Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext)),
            None => dir.join(format!("{} ({})", stem, n)),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

fn save_download(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;

    let dest = unique_destination(dir, name);
    tmp.persist_noclobber(&dest).map_err(|e| e.error)?;
    Ok(dest)
}

impl LibraryStore {
    /// Open a store, loading whatever the storage already holds
    pub fn open(
        backend: Arc<dyn ProcessingBackend>,
        storage: Arc<dyn KeyValueStorage>,
        blobs: BlobRegistry,
        settings: StoreSettings,
    ) -> Self {
        let entries = load_entries(storage.as_ref());
        let last_id = entries.iter().filter_map(|e| e.id.millis()).max().unwrap_or(0);
        info!(entries = entries.len(), backend = backend.name(), "Opened library");

        let state = StoreState {
            entries,
            last_id,
            ..StoreState::default()
        };

        Self {
            inner: Arc::new(Inner {
                backend,
                storage,
                blobs,
                settings,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.inner.blobs
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.inner.settings
    }

    /// Snapshot of live entries, newest first
    pub async fn entries(&self) -> Vec<LibraryEntry> {
        self.inner.state.lock().await.entries.clone()
    }

    pub async fn get(&self, id: &EntryId) -> Option<LibraryEntry> {
        let state = self.inner.state.lock().await;
        state.entries.iter().find(|e| &e.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.state.lock().await.entries.is_empty()
    }

    pub async fn lifecycle(&self, id: &EntryId) -> EntryLifecycle {
        let state = self.inner.state.lock().await;

        if state.position(id).is_some() {
            return EntryLifecycle::Live;
        }
        if let Some(pending) = state.pending.get(id) {
            return EntryLifecycle::PendingDeletion {
                deadline: pending.deadline,
            };
        }
        if let Some(cleared) = &state.pending_clear {
            if cleared.entries.iter().any(|e| &e.id == id) {
                return EntryLifecycle::PendingDeletion {
                    deadline: cleared.deadline,
                };
            }
        }
        EntryLifecycle::Released
    }

    /// Number of single-entry deletions awaiting finalization
    pub async fn pending_deletions(&self) -> usize {
        self.inner.state.lock().await.pending.len()
    }

    pub async fn has_pending_clear(&self) -> bool {
        self.inner.state.lock().await.pending_clear.is_some()
    }

    /// Build an entry from extracted files, prepend it and persist
    async fn insert_new(
        &self,
        source: SourceRef,
        title: String,
        thumbnail: Option<String>,
        files: Vec<ArchiveFile>,
        cache_key: Option<String>,
    ) -> LibraryEntry {
        let layers = generate_layers(&mut rand::thread_rng());

        let extracted_files = files
            .into_iter()
            .map(|f| {
                let handle = self.inner.blobs.create(f.bytes, &f.name);
                ExtractedFile::new(f.name, handle)
            })
            .collect();

        let mut state = self.inner.state.lock().await;
        let entry = LibraryEntry {
            id: state.next_id(),
            source,
            title,
            thumbnail,
            added_at: Utc::now(),
            layers,
            extracted_files,
            cache_key,
            processed: true,
        };

        state.entries.insert(0, entry.clone());
        self.inner.persist(&state.entries);

        info!(
            id = %entry.id,
            title = %entry.title,
            files = entry.extracted_files.len(),
            "Added library entry"
        );
        entry
    }

    /// Title chain: lookup endpoint, then placeholder
    async fn lookup_title(&self, url: &str) -> String {
        match self.inner.backend.lookup_title(url).await {
            Ok(Some(title)) => title,
            Ok(None) => placeholder_title(),
            Err(e) => {
                debug!(error = %e, "Title lookup failed");
                placeholder_title()
            }
        }
    }

    /// Submit a remote link, extract the returned archive and add an entry
    pub async fn add_from_link(&self, url: &str) -> Result<LibraryEntry, LibraryError> {
        let url = url.trim();
        info!(url, "Submitting link");

        let payload = self.inner.backend.submit_link(url).await?;
        let files = archive::extract_all(&payload.bytes)?;

        let title = match payload.title {
            Some(title) => title,
            None => self.lookup_title(url).await,
        };

        Ok(self
            .insert_new(
                SourceRef::link(url),
                title,
                Some(thumbnail_for_link(url)),
                files,
                payload.cache_key,
            )
            .await)
    }

    /// Upload a local file, extract the returned archive and add an entry.
    ///
    /// Size limits are the caller's job; see [`UploadLimits`](crate::limits::UploadLimits).
    pub async fn add_from_file(&self, upload: FileUpload) -> Result<LibraryEntry, LibraryError> {
        info!(file = %upload.file_name, bytes = upload.len(), "Uploading file");

        let payload = self.inner.backend.upload_file(&upload).await?;
        let files = archive::extract_all(&payload.bytes)?;

        if payload.cache_key.is_none() {
            warn!(file = %upload.file_name, "Backend returned no cache key");
        }

        Ok(self
            .insert_new(
                SourceRef::local_file(&upload.file_name),
                upload.file_name.clone(),
                None,
                files,
                payload.cache_key,
            )
            .await)
    }

    /// Remove an entry right away and release its handles
    pub async fn remove(&self, id: &EntryId) -> Result<(), LibraryError> {
        let mut state = self.inner.state.lock().await;

        if let Some(pos) = state.position(id) {
            let mut entry = state.entries.remove(pos);
            self.inner.release(&mut entry);
            self.inner.persist(&state.entries);
            info!(id = %id, "Removed entry");
            return Ok(());
        }

        // Already deleted with undo pending: finalize now
        if let Some(mut pending) = state.pending.remove(id) {
            pending.token.cancel();
            self.inner.release(&mut pending.entry);
            info!(id = %id, "Finalized pending deletion early");
            return Ok(());
        }

        Err(LibraryError::UnknownEntry(id.clone()))
    }

    /// Remove an entry from the list now; release it after `grace` unless undone
    pub async fn schedule_remove(&self, id: &EntryId, grace: Duration) -> Result<(), LibraryError> {
        let mut state = self.inner.state.lock().await;

        let pos = state
            .position(id)
            .ok_or_else(|| LibraryError::UnknownEntry(id.clone()))?;
        let entry = state.entries.remove(pos);
        self.inner.persist(&state.entries);

        let token = CancellationToken::new();
        let generation = state.next_generation();
        state.pending.insert(
            id.clone(),
            PendingDeletion {
                entry,
                deadline: Instant::now() + grace,
                token: token.clone(),
                generation,
            },
        );
        drop(state);

        let inner = Arc::clone(&self.inner);
        let expired_id = id.clone();
        spawn_expiry(grace, token, async move {
            inner.finalize_removal(&expired_id, generation).await;
        });

        info!(id = %id, grace_ms = grace.as_millis() as u64, "Scheduled deletion");
        Ok(())
    }

    /// Restore a pending deletion to the head of the list.
    ///
    /// Returns `false` when nothing is pending for `id`.
    pub async fn undo_remove(&self, id: &EntryId) -> bool {
        let mut state = self.inner.state.lock().await;

        let Some(pending) = state.pending.remove(id) else {
            return false;
        };
        pending.token.cancel();

        state.entries.insert(0, pending.entry);
        self.inner.persist(&state.entries);
        info!(id = %id, "Deletion undone");
        true
    }

    /// Empty the list now; release the former entries after `grace` unless undone.
    ///
    /// Returns how many entries were cleared. An older pending clear is
    /// finalized first.
    pub async fn schedule_clear(&self, grace: Duration) -> usize {
        let mut state = self.inner.state.lock().await;

        if let Some(mut previous) = state.pending_clear.take() {
            previous.token.cancel();
            for entry in previous.entries.iter_mut() {
                self.inner.release(entry);
            }
        }

        let entries = std::mem::take(&mut state.entries);
        let cleared = entries.len();
        self.inner.persist(&state.entries);

        let token = CancellationToken::new();
        let generation = state.next_generation();
        state.pending_clear = Some(PendingClear {
            entries,
            deadline: Instant::now() + grace,
            token: token.clone(),
            generation,
        });
        drop(state);

        let inner = Arc::clone(&self.inner);
        spawn_expiry(grace, token, async move {
            inner.finalize_clear(generation).await;
        });

        info!(entries = cleared, "Scheduled clear");
        cleared
    }

    /// Restore the last cleared collection.
    ///
    /// Entries added since the clear stay in front. Returns `false` when
    /// no clear is pending.
    pub async fn undo_clear(&self) -> bool {
        let mut state = self.inner.state.lock().await;

        let Some(cleared) = state.pending_clear.take() else {
            return false;
        };
        cleared.token.cancel();

        let restored = cleared.entries.len();
        state.entries.extend(cleared.entries);
        self.inner.persist(&state.entries);
        info!(entries = restored, "Clear undone");
        true
    }

    /// Empty the list immediately, releasing every handle
    pub async fn clear(&self) -> usize {
        let mut state = self.inner.state.lock().await;

        let mut entries = std::mem::take(&mut state.entries);
        for entry in entries.iter_mut() {
            self.inner.release(entry);
        }
        self.inner.persist(&state.entries);

        info!(entries = entries.len(), "Cleared library");
        entries.len()
    }

    /// Rename an entry
    pub async fn update_title(
        &self,
        id: &EntryId,
        title: impl Into<String>,
    ) -> Result<(), LibraryError> {
        let title = title.into();
        let mut state = self.inner.state.lock().await;

        let entry = state
            .entries
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| LibraryError::UnknownEntry(id.clone()))?;
        entry.title = title;

        self.inner.persist(&state.entries);
        debug!(id = %id, "Updated title");
        Ok(())
    }

    async fn refetch(
        &self,
        id: &EntryId,
        source: &SourceRef,
        cache_key: Option<&str>,
    ) -> Result<ArchivePayload, LibraryError> {
        if let Some(key) = cache_key {
            debug!(id = %id, "Re-fetching archive by cache key");
            return self.inner.backend.fetch_cached(key).await;
        }

        let url = source
            .url()
            .ok_or_else(|| LibraryError::MissingSource(id.clone()))?;
        debug!(id = %id, "Re-submitting link");
        self.inner.backend.submit_link(url).await
    }

    /// Handle for one extracted file.
    ///
    /// The archive is re-fetched only when the entry no longer holds live
    /// handles; otherwise a file missing from the entry is `NotFound`.
    pub async fn retrieve_playable_file(
        &self,
        entry_id: &EntryId,
        filename: &str,
    ) -> Result<BlobHandle, LibraryError> {
        let (source, cache_key) = {
            let state = self.inner.state.lock().await;
            let entry = state
                .entries
                .iter()
                .find(|e| &e.id == entry_id)
                .ok_or_else(|| LibraryError::UnknownEntry(entry_id.clone()))?;

            if let Some(handle) = live_handle(entry, filename, &self.inner.blobs) {
                return Ok(handle);
            }
            if holds_live_handles(entry, &self.inner.blobs) {
                return Err(LibraryError::NotFound {
                    filename: filename.to_string(),
                });
            }
            (entry.source.clone(), entry.cache_key.clone())
        };

        let payload = self.refetch(entry_id, &source, cache_key.as_deref()).await?;
        let file = archive::extract_one(&payload.bytes, filename)?;

        // Register the blob only once the entry is found
        let mut state = self.inner.state.lock().await;
        let entry = state
            .entries
            .iter_mut()
            .find(|e| &e.id == entry_id)
            .ok_or_else(|| LibraryError::UnknownEntry(entry_id.clone()))?;

        Ok(attach_file(entry, file, &self.inner.blobs))
    }

    /// Save one extracted file to the download directory.
    ///
    /// Cancelling `cancel` before the bytes are written yields
    /// [`DownloadOutcome::Cancelled`].
    pub async fn download_file(
        &self,
        entry_id: &EntryId,
        filename: &str,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, LibraryError> {
        if cancel.is_cancelled() {
            return Ok(DownloadOutcome::Cancelled);
        }

        let handle = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(id = %entry_id, filename, "Download cancelled");
                return Ok(DownloadOutcome::Cancelled);
            }
            result = self.retrieve_playable_file(entry_id, filename) => result?,
        };

        let blob = self
            .inner
            .blobs
            .resolve(&handle)
            .ok_or_else(|| LibraryError::NotFound {
                filename: filename.to_string(),
            })?;

        let dir = self.inner.settings.download_dir.clone();
        let name = base_name(filename);
        let path = tokio::task::spawn_blocking(move || save_download(&dir, &name, &blob.bytes))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        info!(id = %entry_id, path = %path.display(), "Saved download");
        Ok(DownloadOutcome::Saved(path))
    }

    /// Tear down the session: finalize pending deletions and release all handles
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.lock().await;

        let pending: Vec<_> = state.pending.drain().map(|(_, p)| p).collect();
        for mut p in pending {
            p.token.cancel();
            self.inner.release(&mut p.entry);
        }

        if let Some(mut cleared) = state.pending_clear.take() {
            cleared.token.cancel();
            for entry in cleared.entries.iter_mut() {
                self.inner.release(entry);
            }
        }

        for entry in state.entries.iter_mut() {
            self.inner.release(entry);
        }

        info!(remaining_blobs = self.inner.blobs.len(), "Library shut down");
    }
}

/// Existing, still-registered handle for `filename` on this entry
fn live_handle(entry: &LibraryEntry, filename: &str, blobs: &BlobRegistry) -> Option<BlobHandle> {
    let member = find_member(entry.filenames(), filename)?;
    let handle = entry
        .extracted_files
        .iter()
        .find(|f| f.filename == member)?
        .handle
        .clone()?;

    blobs.resolve(&handle).map(|_| handle)
}

/// Whether every extracted file still has a registered handle
fn holds_live_handles(entry: &LibraryEntry, blobs: &BlobRegistry) -> bool {
    entry.has_handles() && entry.handles().all(|h| blobs.resolve(h).is_some())
}

/// Register a freshly fetched member on the entry and return its handle
fn attach_file(entry: &mut LibraryEntry, file: ArchiveFile, blobs: &BlobRegistry) -> BlobHandle {
    let pos = entry
        .extracted_files
        .iter()
        .position(|f| f.filename == file.name);

    if let Some(existing) = pos.and_then(|i| entry.extracted_files[i].handle.as_ref()) {
        if blobs.resolve(existing).is_some() {
            // Another retrieval got here first
            return existing.clone();
        }
    }

    let handle = blobs.create(file.bytes, &file.name);
    match pos {
        Some(i) => entry.extracted_files[i].handle = Some(handle.clone()),
        None => entry
            .extracted_files
            .push(ExtractedFile::new(file.name, handle.clone())),
    }
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::MemoryStorage;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    /// Serves one archive from the cache, once released
    struct GatedBackend {
        archive: Vec<u8>,
        gate: Notify,
    }

    #[async_trait]
    impl ProcessingBackend for GatedBackend {
        fn name(&self) -> &str {
            "gated"
        }

        async fn submit_link(&self, _url: &str) -> Result<ArchivePayload, LibraryError> {
            Err(LibraryError::Network("unused".into()))
        }

        async fn lookup_title(&self, _url: &str) -> Result<Option<String>, LibraryError> {
            Ok(None)
        }

        async fn upload_file(&self, _upload: &FileUpload) -> Result<ArchivePayload, LibraryError> {
            Err(LibraryError::Network("unused".into()))
        }

        async fn fetch_cached(&self, _key: &str) -> Result<ArchivePayload, LibraryError> {
            self.gate.notified().await;
            Ok(ArchivePayload::new(self.archive.clone()))
        }
    }

    fn vocals_zip() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("song/vocals.wav", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"vocals").unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn stored_entry(files: Vec<ExtractedFile>) -> LibraryEntry {
        LibraryEntry {
            id: EntryId::from_millis(1),
            source: SourceRef::local_file("mix.wav"),
            title: "mix.wav".to_string(),
            thumbnail: None,
            added_at: Utc::now(),
            layers: Vec::new(),
            extracted_files: files,
            cache_key: Some("k".to_string()),
            processed: true,
        }
    }

    #[tokio::test]
    async fn test_dropped_retrieval_registers_no_blob() {
        let backend = Arc::new(GatedBackend {
            archive: vocals_zip(),
            gate: Notify::new(),
        });
        let store = LibraryStore::open(
            backend.clone(),
            Arc::new(MemoryStorage::new()),
            BlobRegistry::new(),
            StoreSettings::default(),
        );
        let entry = stored_entry(vec![ExtractedFile {
            filename: "song/vocals.wav".to_string(),
            handle: None,
        }]);
        let id = entry.id.clone();
        store.inner.state.lock().await.entries.push(entry);

        let task = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move { store.retrieve_playable_file(&id, "vocals.wav").await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        // Fetch completes while the state is locked, then the caller gives up
        let guard = store.inner.state.lock().await;
        backend.gate.notify_one();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        drop(guard);

        assert!(store.blobs().is_empty());
        assert!(!store.get(&id).await.unwrap().has_handles());
    }

    #[test]
    fn test_attach_file_reuses_live_handle() {
        let blobs = BlobRegistry::new();
        let existing = blobs.create(b"first".to_vec(), "song/vocals.wav");
        let mut entry = stored_entry(vec![ExtractedFile::new("song/vocals.wav", existing.clone())]);

        let file = ArchiveFile {
            name: "song/vocals.wav".to_string(),
            bytes: b"second".to_vec(),
        };
        assert_eq!(attach_file(&mut entry, file, &blobs), existing);
        assert_eq!(blobs.len(), 1);

        blobs.revoke(&existing);
        let file = ArchiveFile {
            name: "song/vocals.wav".to_string(),
            bytes: b"third".to_vec(),
        };
        let fresh = attach_file(&mut entry, file, &blobs);
        assert_ne!(fresh, existing);
        assert_eq!(blobs.resolve(&fresh).unwrap().bytes.as_slice(), b"third");
        assert_eq!(entry.extracted_files.len(), 1);
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("song/stems/vocals.wav"), "vocals.wav");
        assert_eq!(base_name("vocals.wav"), "vocals.wav");
        assert_eq!(base_name("dir/"), "dir");
        assert_eq!(base_name(""), "download");
    }

    #[test]
    fn test_unique_destination() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();

        assert_eq!(unique_destination(dir, "vocals.wav"), dir.join("vocals.wav"));

        std::fs::write(dir.join("vocals.wav"), b"x").unwrap();
        assert_eq!(
            unique_destination(dir, "vocals.wav"),
            dir.join("vocals (1).wav")
        );

        std::fs::write(dir.join("vocals (1).wav"), b"x").unwrap();
        assert_eq!(
            unique_destination(dir, "vocals.wav"),
            dir.join("vocals (2).wav")
        );
    }

    #[test]
    fn test_save_download_writes_bytes() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("downloads");

        let path = save_download(&dir, "bass.wav", b"RIFFdata").unwrap();
        assert_eq!(path, dir.join("bass.wav"));
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFFdata");

        let second = save_download(&dir, "bass.wav", b"other").unwrap();
        assert_eq!(second, dir.join("bass (1).wav"));
    }

    #[test]
    fn test_next_id_is_monotonic() {
        let mut state = StoreState {
            last_id: i64::MAX / 2,
            ..StoreState::default()
        };

        let first = state.next_id();
        let second = state.next_id();
        assert_eq!(second.millis(), first.millis().map(|m| m + 1));
    }

    #[test]
    fn test_placeholder_title_shape() {
        let title = placeholder_title();
        assert!(title.starts_with("Untitled session "));
        assert_eq!(title.len(), "Untitled session ".len() + 4);
    }
}

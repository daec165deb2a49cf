//! Persisted library record.
//!
//! The whole list lives under a single storage key as
//! `{ "version": 1, "entries": [...] }`. Blob handles are skipped during
//! serialization, so the record only ever holds scalars and filenames.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::storage::{KeyValueStorage, StorageError};
use crate::domain::LibraryEntry;

/// Storage key for the library record (shared with the session layer)
pub const LIBRARY_STORAGE_KEY: &str = "stemshelf.library";

const RECORD_VERSION: u32 = 1;

/// On-disk shape of the library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedLibrary {
    /// Record format version
    pub version: u32,

    /// Entries, newest first
    pub entries: Vec<LibraryEntry>,
}

impl PersistedLibrary {
    pub fn new(entries: Vec<LibraryEntry>) -> Self {
        Self {
            version: RECORD_VERSION,
            entries,
        }
    }
}

/// Load entries from storage.
///
/// A missing, unreadable, or corrupt record yields an empty list.
pub fn load_entries(storage: &dyn KeyValueStorage) -> Vec<LibraryEntry> {
    let raw = match storage.get_item(LIBRARY_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "Failed to read library record");
            return Vec::new();
        }
    };

    match serde_json::from_str::<PersistedLibrary>(&raw) {
        Ok(record) => {
            if record.version != RECORD_VERSION {
                warn!(version = record.version, "Unexpected library record version");
            }
            record.entries
        }
        Err(e) => {
            warn!(error = %e, "Discarding corrupt library record");
            Vec::new()
        }
    }
}

/// Write entries to storage, removing the key when the list is empty
pub fn save_entries(
    storage: &dyn KeyValueStorage,
    entries: &[LibraryEntry],
) -> Result<(), StorageError> {
    if entries.is_empty() {
        return storage.remove_item(LIBRARY_STORAGE_KEY);
    }

    let record = PersistedLibrary::new(entries.to_vec());
    let json = serde_json::to_string(&record)?;
    storage.set_item(LIBRARY_STORAGE_KEY, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntryId, SourceRef};
    use crate::library::storage::MemoryStorage;
    use chrono::Utc;

    fn entry(id: i64) -> LibraryEntry {
        LibraryEntry {
            id: EntryId::from_millis(id),
            source: SourceRef::local_file("mix.mp3"),
            title: "mix.mp3".to_string(),
            thumbnail: None,
            added_at: Utc::now(),
            layers: Vec::new(),
            extracted_files: Vec::new(),
            cache_key: Some("abc".to_string()),
            processed: true,
        }
    }

    #[test]
    fn test_save_and_load() {
        let storage = MemoryStorage::new();
        save_entries(&storage, &[entry(2), entry(1)]).unwrap();

        let loaded = load_entries(&storage);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, EntryId::from_millis(2));
        assert_eq!(loaded[1].cache_key.as_deref(), Some("abc"));
    }

    #[test]
    fn test_empty_list_removes_key() {
        let storage = MemoryStorage::new();
        save_entries(&storage, &[entry(1)]).unwrap();
        save_entries(&storage, &[]).unwrap();

        assert_eq!(storage.get_item(LIBRARY_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_corrupt_record_loads_empty() {
        let storage = MemoryStorage::new();
        storage
            .set_item(LIBRARY_STORAGE_KEY, "{not json")
            .unwrap();

        assert!(load_entries(&storage).is_empty());
    }

    #[test]
    fn test_added_at_is_iso_string() {
        let storage = MemoryStorage::new();
        save_entries(&storage, &[entry(1)]).unwrap();

        let raw = storage.get_item(LIBRARY_STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let added_at = value["entries"][0]["added_at"].as_str().unwrap();
        assert!(added_at.contains('T'));
    }
}

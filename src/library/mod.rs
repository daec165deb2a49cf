//! Library of processed stem-separation results.
//!
//! The library keeps entries in memory, persists their scalar fields to a
//! key-value storage, and mediates archive retrieval for playback and
//! download.
//!
//! # Persisted Layout
//!
//! ```text
//! ~/.stemshelf/
//! ├── storage.json      # Key-value storage (local-storage equivalent)
//! │   └── "stemshelf.library" -> { "version": 1, "entries": [...] }
//! └── storage.lock      # fs2 lock guarding writes
//! ```

pub mod pending;
pub mod persist;
pub mod storage;
pub mod store;

pub use pending::EntryLifecycle;
pub use persist::{load_entries, save_entries, PersistedLibrary, LIBRARY_STORAGE_KEY};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use store::{DownloadOutcome, LibraryStore, StoreSettings};

//! stemshelf - Library manager for stem separation results
//!
//! A client for a remote stem separation service. Users submit a video
//! link or upload an audio file; the service answers with a ZIP archive
//! of stems (vocals, drums, bass, ...), which stemshelf unpacks into
//! in-memory handles for playback and saves to disk on request.
//!
//! # Architecture
//!
//! - The library list is kept in memory and persisted after every change
//! - Persisted records hold scalars and filenames only; handles are
//!   re-derived by re-fetching the archive
//! - Deletes and clears are two-phase: removed now, released after a
//!   grace window unless undone
//!
//! # Modules
//!
//! - `adapters`: Processing service client (HTTP)
//! - `archive`: ZIP extraction and member lookup
//! - `blobs`: Process-lifetime binary handles
//! - `domain`: Data structures (LibraryEntry, LayerInfo, SourceRef)
//! - `library`: LibraryStore, storage and persisted record
//! - `session`: Sign-in/sign-out hooks around the store
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Separate a video
//! stemshelf add https://youtu.be/dQw4w9WgXcQ
//!
//! # Upload a local file
//! stemshelf upload ./mix.mp3
//!
//! # Save one stem
//! stemshelf download <entry-id> vocals.wav
//! ```

pub mod adapters;
pub mod archive;
pub mod blobs;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod library;
pub mod limits;
pub mod session;

// Re-export main types at crate root for convenience
pub use adapters::{ArchivePayload, FileUpload, HttpBackend, ProcessingBackend};
pub use blobs::{BlobHandle, BlobRegistry};
pub use domain::{EntryId, ExtractedFile, LayerInfo, LibraryEntry, SourceRef};
pub use error::{ErrorKind, LibraryError};
pub use library::{DownloadOutcome, EntryLifecycle, LibraryStore, StoreSettings};
pub use limits::UploadLimits;
pub use session::{IdentityChange, Session};

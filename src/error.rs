//! Error types surfaced by library operations.
//!
//! Each variant maps onto an [`ErrorKind`] so callers can pick the right
//! user action without matching on every variant.

use thiserror::Error;

use crate::domain::EntryId;

/// Errors returned by [`LibraryStore`](crate::library::LibraryStore) operations
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Transport-level failure (connection refused, DNS, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-2xx status
    #[error("Backend returned {status}{}", detail_suffix(.detail))]
    Backend { status: u16, detail: Option<String> },

    /// The archive does not contain the requested member
    #[error("File not found in archive: {filename}")]
    NotFound { filename: String },

    /// No live entry with this id
    #[error("Library entry not found: {0}")]
    UnknownEntry(EntryId),

    /// Entry has neither a cache key nor a link to re-fetch from
    #[error("Entry {0} has no cache key or link to re-fetch from")]
    MissingSource(EntryId),

    /// Backend bytes could not be read as an archive
    #[error("Invalid archive: {0}")]
    Archive(String),

    /// Caller-side validation failed before anything was sent
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {}", d),
        None => String::new(),
    }
}

/// Coarse classification for user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Backend unreachable, retry later
    Network,
    /// Backend rejected the request, re-submit
    Backend,
    /// Result is missing a file, report a bug
    NotFound,
    /// Caller input was rejected
    Validation,
    /// Local failure (disk, unknown entry)
    Local,
}

impl LibraryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LibraryError::Network(_) => ErrorKind::Network,
            LibraryError::Backend { .. } | LibraryError::Archive(_) => ErrorKind::Backend,
            LibraryError::NotFound { .. } | LibraryError::MissingSource(_) => ErrorKind::NotFound,
            LibraryError::Validation(_) => ErrorKind::Validation,
            LibraryError::UnknownEntry(_) | LibraryError::Io(_) => ErrorKind::Local,
        }
    }
}

impl From<reqwest::Error> for LibraryError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => LibraryError::Backend {
                status: status.as_u16(),
                detail: None,
            },
            None => LibraryError::Network(err.to_string()),
        }
    }
}

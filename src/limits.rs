//! Caller-side upload validation.
//!
//! The store never checks sizes itself; callers validate an upload here
//! before handing it to [`LibraryStore::add_from_file`](crate::LibraryStore::add_from_file).

use serde::{Deserialize, Serialize};

use crate::adapters::FileUpload;
use crate::error::LibraryError;

/// Upload limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadLimits {
    /// Maximum upload size in bytes (default: 10MB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

pub(crate) fn default_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
} // 10MB

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl UploadLimits {
    /// Reject empty or oversize uploads
    pub fn validate(&self, upload: &FileUpload) -> Result<(), LibraryError> {
        if upload.is_empty() {
            return Err(LibraryError::Validation(format!(
                "{} is empty",
                upload.file_name
            )));
        }

        let size = upload.len() as u64;
        if size > self.max_upload_bytes {
            return Err(LibraryError::Validation(format!(
                "{} is {} bytes, limit is {} bytes",
                upload.file_name, size, self.max_upload_bytes
            )));
        }

        Ok(())
    }
}

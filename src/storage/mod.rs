//! Blob storage for raw payloads.
//!
//! Ingestion only needs "put these bytes at this key". [`LocalDirStore`]
//! maps keys onto a directory tree; [`MemoryStore`] keeps everything in
//! memory for dry runs.

mod local;
mod memory;

pub use local::LocalDirStore;
pub use memory::{MemoryStore, StoredBlob};

use async_trait::async_trait;
use thiserror::Error;

/// Content type used for every raw payload.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid key '{0}'")]
    InvalidKey(String),

    #[error("IO error writing '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Write-only object storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `body` under `key`, replacing anything already there.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError>;
}

/// Keys are relative, `/`-separated, and free of empty, `.` and `..` segments.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if !key.is_empty() && key.split('/').all(is_valid_segment) {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Check a value that must form exactly one key segment.
pub fn validate_segment(segment: &str) -> Result<(), StorageError> {
    if is_valid_segment(segment) {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(segment.to_string()))
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains('/')
        && !segment.contains('\\')
}

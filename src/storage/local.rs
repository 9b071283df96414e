//! Directory-backed [`BlobStore`]: each key becomes a file path under a root.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{validate_key, BlobStore, StorageError};

/// Stores each blob as a file under a root directory, one file per key.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path a key maps to.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

#[async_trait]
impl BlobStore for LocalDirStore {
    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&path, body).await.map_err(io_err)?;

        tracing::trace!(path = %path.display(), "Wrote blob");
        Ok(())
    }
}

//! Crate-level error type for ingestion runs.

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

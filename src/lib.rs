//! # Wistia raw ingestion
//!
//! Pulls analytics from the Wistia stats API and lands the payloads,
//! unmodified, as JSON objects in a date-partitioned key layout.
//!
//! ## Modules
//!
//! - [`api`]: stats API client with Basic auth, retry/backoff, and pagination
//! - [`storage`]: "put blob at key" stores (local directory, in-memory)
//! - [`ingest`]: run configuration, key layout, and the ingestion runner
//!
//! Plus:
//! - [`network`]: base URL and auth constants
//! - [`error`]: crate-level error type
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wistia_ingest::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WistiaApiClient::new(std::env::var(API_TOKEN_ENV)?)?;
//!     let store = LocalDirStore::new("./data");
//!     let config = IngestConfig::new(vec!["gskhw4w4lm".to_string()]);
//!
//!     let report = run_ingestion(&client, &store, &config).await?;
//!     println!("Wrote {} objects", report.total());
//!
//!     Ok(())
//! }
//! ```

// ============================================================================
// MODULES
// ============================================================================

/// Stats API client: requests, retry policy, pagination, errors.
pub mod api;

/// Crate-level error type.
pub mod error;

/// Ingestion runner and object key layout.
pub mod ingest;

/// Network URL and credential constants.
pub mod network;

/// Blob storage backends.
pub mod storage;

// ============================================================================
// PRELUDE
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use wistia_ingest::prelude::*;
/// ```
pub mod prelude {
    pub use crate::api::{
        ApiError, ApiResult, Page, ParamValue, QueryParams, RetryConfig, RetryReason,
        WistiaApiClient, WistiaApiClientBuilder, DEFAULT_PER_PAGE,
    };

    pub use crate::error::Error;

    pub use crate::ingest::{run_ingestion, Endpoint, IngestConfig, IngestReport};

    pub use crate::network::{API_TOKEN_ENV, DEFAULT_API_URL};

    pub use crate::storage::{BlobStore, LocalDirStore, MemoryStore, StorageError};
}

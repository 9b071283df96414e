//! REST client module for the Wistia stats API.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use futures_util::TryStreamExt;
//! use wistia_ingest::api::WistiaApiClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WistiaApiClient::new("your-api-token")?;
//!
//!     let engagement = client.get_media_engagement("gskhw4w4lm").await?;
//!     println!("{}", engagement);
//!
//!     let pages: Vec<_> = client.events(100).try_collect().await?;
//!     println!("Fetched {} pages of events", pages.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Client Configuration
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use wistia_ingest::api::WistiaApiClient;
//!
//! let client = WistiaApiClient::builder("your-api-token")
//!     .base_url("https://api.wistia.com/v1")
//!     .timeout(Duration::from_secs(60))
//!     .max_retries(4)
//!     .build()?;
//! ```
//!
//! # Error Handling
//!
//! Rate limits (429) and server errors (5xx) are retried with exponential
//! backoff. Callers only see them as [`ApiError::RetriesExhausted`] once the
//! attempt budget is spent:
//!
//! ```rust,ignore
//! match client.get_media_stats("missing").await {
//!     Ok(stats) => println!("{}", stats),
//!     Err(ApiError::ClientError { status: 404, .. }) => println!("no such media"),
//!     Err(ApiError::RetriesExhausted { url, .. }) => println!("gave up on {}", url),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```

pub mod client;
pub mod error;
pub mod pagination;
pub mod params;
pub mod retry;

pub use client::{WistiaApiClient, WistiaApiClientBuilder};
pub use error::{ApiError, ApiResult};
pub use pagination::{is_end_of_pages, Page, DEFAULT_PER_PAGE, EVENTS_PATH, VISITORS_PATH};
pub use params::{ParamValue, QueryParams};
pub use retry::{RetryConfig, RetryReason, StatusClass};

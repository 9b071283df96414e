//! API error types for the Wistia stats client.

use thiserror::Error;

use crate::api::retry::RetryReason;

/// API-specific error type for the Wistia stats client.
///
/// Rate limiting and server errors are retried internally and only reach
/// the caller wrapped in [`ApiError::RetriesExhausted`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP client could not be constructed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-retryable status (any non-200 that is neither 429 nor 5xx)
    #[error("API error {status}: {body}")]
    ClientError { status: u16, body: String },

    /// Every attempt ended in a retryable failure
    #[error("Failed after {attempts} attempts: {url} (last: {last})")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: RetryReason,
    },

    /// 200 response whose body is not valid JSON
    #[error("Deserialization error: {0}")]
    Deserialize(String),

    /// Invalid parameter provided
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// API token absent or blank
    #[error("Missing API credential")]
    MissingCredential,
}

impl ApiError {
    /// HTTP status carried by the error, if any.
    ///
    /// For exhausted retries this is the status of the last attempt.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ClientError { status, .. } => Some(*status),
            ApiError::RetriesExhausted { last, .. } => last.status(),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, ApiError::RetriesExhausted { .. })
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

//! Wistia stats API client implementation.
//!
//! The [`WistiaApiClient`] authenticates with HTTP Basic auth, retries
//! rate-limited and failing requests with exponential backoff, and hands
//! back raw JSON payloads.
//!
//! # Example
//!
//! ```rust,ignore
//! use wistia_ingest::api::WistiaApiClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WistiaApiClient::new(std::env::var("WISTIA_API_TOKEN")?)?;
//!
//!     let stats = client.get_media_stats("gskhw4w4lm").await?;
//!     println!("{}", stats);
//!
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;

use crate::api::error::{ApiError, ApiResult};
use crate::api::params::QueryParams;
use crate::api::retry::{RetryConfig, RetryReason, StatusClass};
use crate::network::{BASIC_AUTH_USERNAME, DEFAULT_API_URL};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Date format for `start_date` / `end_date` query parameters.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Builder for configuring [`WistiaApiClient`].
#[derive(Clone)]
pub struct WistiaApiClientBuilder {
    api_token: String,
    base_url: String,
    timeout: Duration,
    default_headers: Vec<(String, String)>,
    retry_config: RetryConfig,
}

impl WistiaApiClientBuilder {
    /// Create a new builder with the given API token.
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_headers: Vec::new(),
            retry_config: RetryConfig::default(),
        }
    }

    /// Override the API base URL. A trailing slash is removed.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Set the number of attempts per request, keeping the backoff unit.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.retry_config.max_retries = max_retries;
        self
    }

    /// Replace the whole retry configuration.
    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Add a default header to all requests.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// [`ApiError::MissingCredential`] for a blank token,
    /// [`ApiError::InvalidParameter`] for a zero attempt budget or a bad header.
    pub fn build(self) -> ApiResult<WistiaApiClient> {
        if self.api_token.trim().is_empty() {
            return Err(ApiError::MissingCredential);
        }
        if self.retry_config.max_retries == 0 {
            return Err(ApiError::InvalidParameter(
                "max_retries must be at least 1".to_string(),
            ));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        for (name, value) in self.default_headers {
            let header_name = reqwest::header::HeaderName::try_from(name.as_str())
                .map_err(|e| ApiError::InvalidParameter(format!("Invalid header name '{}': {}", name, e)))?;
            let header_value = reqwest::header::HeaderValue::from_str(&value)
                .map_err(|e| ApiError::InvalidParameter(format!("Invalid header value for '{}': {}", name, e)))?;
            headers.insert(header_name, header_value);
        }

        let http_client = Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(10)
            .default_headers(headers)
            .build()?;

        Ok(WistiaApiClient {
            http_client,
            base_url: self.base_url,
            api_token: self.api_token,
            timeout: self.timeout,
            retry_config: self.retry_config,
        })
    }
}

impl fmt::Debug for WistiaApiClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WistiaApiClientBuilder")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry_config", &self.retry_config)
            .finish_non_exhaustive()
    }
}

/// Wistia stats API client.
///
/// The connection profile (base URL, token, timeout, retry budget) is fixed
/// at construction. Requests are issued one at a time by the caller; the
/// underlying connection pool is reused across calls.
#[derive(Clone)]
pub struct WistiaApiClient {
    http_client: Client,
    base_url: String,
    /// Basic-auth password. Never printed.
    api_token: String,
    timeout: Duration,
    retry_config: RetryConfig,
}

impl WistiaApiClient {
    /// Create a client with default settings (public API URL, 30s timeout, 6 attempts).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingCredential`] if the token is blank.
    pub fn new(api_token: impl Into<String>) -> ApiResult<Self> {
        WistiaApiClientBuilder::new(api_token).build()
    }

    /// Create a new client builder for custom configuration.
    pub fn builder(api_token: impl Into<String>) -> WistiaApiClientBuilder {
        WistiaApiClientBuilder::new(api_token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    // =========================================================================
    // Media endpoints
    // =========================================================================

    /// Aggregate stats for one media.
    pub async fn get_media_stats(&self, media_id: &str) -> ApiResult<Value> {
        let path = format!("/stats/medias/{}.json", encode_media_id(media_id)?);
        self.fetch(&path, &QueryParams::new()).await
    }

    /// Engagement graph for one media.
    pub async fn get_media_engagement(&self, media_id: &str) -> ApiResult<Value> {
        let path = format!(
            "/stats/medias/{}/engagement.json",
            encode_media_id(media_id)?
        );
        self.fetch(&path, &QueryParams::new()).await
    }

    /// Day-by-day stats for one media over an inclusive date range.
    pub async fn get_media_by_date(
        &self,
        media_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ApiResult<Value> {
        if start_date > end_date {
            return Err(ApiError::InvalidParameter(format!(
                "start_date {} is after end_date {}",
                start_date, end_date
            )));
        }
        let path = format!("/stats/medias/{}/by_date.json", encode_media_id(media_id)?);
        let params = QueryParams::new()
            .with("start_date", start_date.format(DATE_FORMAT).to_string())
            .with("end_date", end_date.format(DATE_FORMAT).to_string());
        self.fetch(&path, &params).await
    }

    // =========================================================================
    // Core request loop
    // =========================================================================

    /// GET `base_url + path` and return the parsed JSON body.
    ///
    /// Up to `max_retries` attempts are made. 429 waits `2^attempt` backoff
    /// units, 5xx and transport failures wait the same plus jitter. Any other
    /// non-200 status fails immediately with [`ApiError::ClientError`].
    pub async fn fetch(&self, path: &str, params: &QueryParams) -> ApiResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let max_retries = self.retry_config.max_retries;
        let mut last = None;

        for attempt in 0..max_retries {
            let result = self
                .http_client
                .get(&url)
                .query(params)
                .basic_auth(BASIC_AUTH_USERNAME, Some(&self.api_token))
                .send()
                .await;

            let reason = match result {
                Ok(response) => {
                    let status = response.status();
                    match StatusClass::of(status) {
                        StatusClass::Success => match response.text().await {
                            Ok(text) => return Self::parse_body(&text),
                            Err(e) => RetryReason::Transport(e.to_string()),
                        },
                        StatusClass::RateLimited => RetryReason::RateLimited,
                        StatusClass::ServerError => RetryReason::ServerError {
                            status: status.as_u16(),
                            body: Self::read_body(response).await,
                        },
                        StatusClass::Fatal => {
                            let body = Self::read_body(response).await;
                            tracing::warn!(
                                status = status.as_u16(),
                                url = %url,
                                "Request failed with non-retryable status"
                            );
                            return Err(ApiError::ClientError {
                                status: status.as_u16(),
                                body,
                            });
                        }
                    }
                }
                Err(e) if e.is_builder() => return Err(ApiError::Http(e)),
                Err(e) => RetryReason::Transport(e.to_string()),
            };

            if attempt + 1 < max_retries {
                let delay = self.retry_config.delay_for(attempt, &reason);
                tracing::debug!(
                    attempt = attempt + 1,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    reason = %reason,
                    "Retrying request to {}",
                    url
                );
                tokio::time::sleep(delay).await;
            }
            last = Some(reason);
        }

        let last = last.unwrap_or_else(|| RetryReason::Transport("no attempts made".to_string()));
        tracing::warn!(attempts = max_retries, url = %url, last = %last, "Retries exhausted");
        Err(ApiError::RetriesExhausted {
            url,
            attempts: max_retries,
            last,
        })
    }

    fn parse_body(text: &str) -> ApiResult<Value> {
        serde_json::from_str(text)
            .map_err(|e| ApiError::Deserialize(format!("Failed to deserialize response: {}", e)))
    }

    async fn read_body(response: reqwest::Response) -> String {
        match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to read error response body: {}", e);
                String::new()
            }
        }
    }
}

impl fmt::Debug for WistiaApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WistiaApiClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry_config", &self.retry_config)
            .finish_non_exhaustive()
    }
}

/// Validate a media id and percent-encode it for use as a path segment.
fn encode_media_id(media_id: &str) -> ApiResult<String> {
    if media_id.trim().is_empty() {
        return Err(ApiError::InvalidParameter(
            "media_id cannot be empty".to_string(),
        ));
    }
    Ok(urlencoding::encode(media_id).into_owned())
}

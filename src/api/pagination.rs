//! Page-numbered pagination over list endpoints.
//!
//! Pages are requested with `page` and `per_page` query parameters starting
//! at page 1. The first falsy payload (`null`, `[]`, `{}`, `""`, `false`, or
//! zero) ends the sequence without being yielded.

use async_stream::try_stream;
use futures_util::Stream;
use serde_json::Value;

use crate::api::client::WistiaApiClient;
use crate::api::error::{ApiError, ApiResult};
use crate::api::params::QueryParams;

/// Default page size for paginated endpoints.
pub const DEFAULT_PER_PAGE: u32 = 100;

pub const EVENTS_PATH: &str = "/stats/events.json";
pub const VISITORS_PATH: &str = "/stats/visitors.json";

/// One non-empty page of a paginated endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub payload: Value,
}

impl Page {
    pub fn into_parts(self) -> (u32, Value) {
        (self.number, self.payload)
    }
}

/// Whether a payload marks the end of a paginated result set.
pub fn is_end_of_pages(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

impl WistiaApiClient {
    /// Lazily fetch every page of `path`.
    ///
    /// Nothing is requested until the stream is polled, and each poll issues
    /// at most one request. A failed page is yielded as an error and ends the
    /// stream. The stream cannot be restarted; call `paginate` again to start
    /// over from page 1.
    ///
    /// ```rust,ignore
    /// use futures_util::{pin_mut, StreamExt};
    ///
    /// let pages = client.paginate("/stats/events.json", 100);
    /// pin_mut!(pages);
    /// while let Some(page) = pages.next().await {
    ///     let page = page?;
    ///     println!("page {}: {}", page.number, page.payload);
    /// }
    /// ```
    pub fn paginate(
        &self,
        path: impl Into<String>,
        per_page: u32,
    ) -> impl Stream<Item = ApiResult<Page>> + '_ {
        let path = path.into();
        try_stream! {
            if per_page == 0 {
                Err::<(), _>(ApiError::InvalidParameter(
                    "per_page must be at least 1".to_string(),
                ))?;
            }

            let mut number: u32 = 1;
            loop {
                let params = QueryParams::new()
                    .with("page", number)
                    .with("per_page", per_page);
                let payload = self.fetch(&path, &params).await?;

                if is_end_of_pages(&payload) {
                    tracing::debug!(path = %path, page = number, "Reached end of pages");
                    break;
                }

                yield Page { number, payload };
                number += 1;
            }
        }
    }

    /// All pages of `/stats/events.json`.
    pub fn events(&self, per_page: u32) -> impl Stream<Item = ApiResult<Page>> + '_ {
        self.paginate(EVENTS_PATH, per_page)
    }

    /// All pages of `/stats/visitors.json`.
    pub fn visitors(&self, per_page: u32) -> impl Stream<Item = ApiResult<Page>> + '_ {
        self.paginate(VISITORS_PATH, per_page)
    }
}

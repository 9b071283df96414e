//! Settings for a single ingestion run.

use chrono::{Local, NaiveDate};

use crate::api::DEFAULT_PER_PAGE;
use crate::error::{Error, Result};
use crate::storage::{validate_key, validate_segment};

/// Default key prefix for raw payloads.
pub const DEFAULT_RAW_PREFIX: &str = "raw/wistia";

/// Settings for one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Leading key segments, without a trailing slash.
    pub raw_prefix: String,
    /// Media whose per-media stats are fetched, in order.
    pub media_ids: Vec<String>,
    /// Partition date; also the by-date stats range.
    pub run_date: NaiveDate,
    /// Page size for events and visitors.
    pub per_page: u32,
}

impl IngestConfig {
    /// Config for today's local date with default prefix and page size.
    pub fn new(media_ids: Vec<String>) -> Self {
        Self {
            raw_prefix: DEFAULT_RAW_PREFIX.to_string(),
            media_ids,
            run_date: Local::now().date_naive(),
            per_page: DEFAULT_PER_PAGE,
        }
    }

    pub fn with_raw_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.raw_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_run_date(mut self, run_date: NaiveDate) -> Self {
        self.run_date = run_date;
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Reject settings that would only fail once objects are being written.
    pub fn validate(&self) -> Result<()> {
        if self.raw_prefix.is_empty() {
            return Err(Error::Config("raw prefix cannot be empty".to_string()));
        }
        validate_key(&self.raw_prefix)
            .map_err(|_| Error::Config(format!("invalid raw prefix '{}'", self.raw_prefix)))?;
        if self.per_page == 0 {
            return Err(Error::Config("per_page must be at least 1".to_string()));
        }
        if let Some(bad) = self
            .media_ids
            .iter()
            .find(|id| id.trim().is_empty() || validate_segment(id).is_err())
        {
            return Err(Error::Config(format!("invalid media id '{}'", bad)));
        }
        Ok(())
    }
}

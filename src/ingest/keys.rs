//! Object key layout for raw payloads.
//!
//! ```text
//! {prefix}/endpoint={name}/run_date={YYYY-MM-DD}/media_id={id}/part-{hex}.json
//! {prefix}/endpoint={name}/run_date={YYYY-MM-DD}/page={NNNN}/part-{hex}.json
//! ```

use std::fmt;

use chrono::NaiveDate;
use uuid::Uuid;

/// Stats endpoints that get landed in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    MediaByDate,
    MediaEngagement,
    MediaStats,
    Events,
    Visitors,
}

impl Endpoint {
    /// Partition name used in the `endpoint=` segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::MediaByDate => "media_by_date",
            Endpoint::MediaEngagement => "media_engagement",
            Endpoint::MediaStats => "media_stats",
            Endpoint::Events => "events",
            Endpoint::Visitors => "visitors",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Random per-write suffix: a v4 UUID as 32 lowercase hex digits.
pub fn new_part_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn partition_root(prefix: &str, endpoint: Endpoint, run_date: NaiveDate) -> String {
    format!(
        "{}/endpoint={}/run_date={}",
        prefix.trim_end_matches('/'),
        endpoint,
        run_date.format("%Y-%m-%d")
    )
}

/// Key for a per-media payload.
pub fn media_key(
    prefix: &str,
    endpoint: Endpoint,
    run_date: NaiveDate,
    media_id: &str,
    part_id: &str,
) -> String {
    format!(
        "{}/media_id={}/part-{}.json",
        partition_root(prefix, endpoint, run_date),
        media_id,
        part_id
    )
}

/// Key for one page of a paginated endpoint. Pages are zero-padded to four digits.
pub fn page_key(
    prefix: &str,
    endpoint: Endpoint,
    run_date: NaiveDate,
    page: u32,
    part_id: &str,
) -> String {
    format!(
        "{}/page={:04}/part-{}.json",
        partition_root(prefix, endpoint, run_date),
        page,
        part_id
    )
}

//! Ingestion runner.
//!
//! Per-media endpoints are fetched first, for each media id in order, then
//! every page of events and visitors. The first failure aborts the run;
//! objects already written stay in the store.

use futures_util::{pin_mut, StreamExt};
use serde_json::Value;

use crate::api::{WistiaApiClient, EVENTS_PATH, VISITORS_PATH};
use crate::error::Result;
use crate::ingest::config::IngestConfig;
use crate::ingest::keys::{media_key, new_part_id, page_key, Endpoint};
use crate::storage::{BlobStore, JSON_CONTENT_TYPE};

/// One object written during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenObject {
    pub endpoint: Endpoint,
    pub key: String,
}

/// What a successful run wrote, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub written: Vec<WrittenObject>,
}

impl IngestReport {
    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.written.iter().filter(|o| o.endpoint == endpoint).count()
    }

    pub fn total(&self) -> usize {
        self.written.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.written.iter().map(|o| o.key.as_str())
    }
}

/// Land every configured endpoint in `store`.
///
/// Per media id: by-date stats for the run date, engagement, then stats.
/// Afterwards every page of events, then every page of visitors. The first
/// failure aborts the run; objects already written stay in place.
pub async fn run_ingestion<S>(
    client: &WistiaApiClient,
    store: &S,
    config: &IngestConfig,
) -> Result<IngestReport>
where
    S: BlobStore + ?Sized,
{
    config.validate()?;
    let mut report = IngestReport::default();

    tracing::info!(
        run_date = %config.run_date,
        media_count = config.media_ids.len(),
        prefix = %config.raw_prefix,
        "Starting Wistia raw ingestion"
    );

    for media_id in &config.media_ids {
        let data = client
            .get_media_by_date(media_id, config.run_date, config.run_date)
            .await?;
        write_media(store, config, &mut report, Endpoint::MediaByDate, media_id, &data).await?;

        let data = client.get_media_engagement(media_id).await?;
        write_media(store, config, &mut report, Endpoint::MediaEngagement, media_id, &data).await?;

        let data = client.get_media_stats(media_id).await?;
        write_media(store, config, &mut report, Endpoint::MediaStats, media_id, &data).await?;
    }

    for (endpoint, path) in [(Endpoint::Events, EVENTS_PATH), (Endpoint::Visitors, VISITORS_PATH)] {
        let pages = client.paginate(path, config.per_page);
        pin_mut!(pages);
        while let Some(page) = pages.next().await {
            let page = page?;
            let key = page_key(
                &config.raw_prefix,
                endpoint,
                config.run_date,
                page.number,
                &new_part_id(),
            );
            write_json(store, &mut report, endpoint, key, &page.payload).await?;
        }
    }

    tracing::info!(objects = report.total(), "Wistia raw ingestion completed");
    Ok(report)
}

async fn write_media<S: BlobStore + ?Sized>(
    store: &S,
    config: &IngestConfig,
    report: &mut IngestReport,
    endpoint: Endpoint,
    media_id: &str,
    payload: &Value,
) -> Result<()> {
    let key = media_key(
        &config.raw_prefix,
        endpoint,
        config.run_date,
        media_id,
        &new_part_id(),
    );
    write_json(store, report, endpoint, key, payload).await
}

async fn write_json<S: BlobStore + ?Sized>(
    store: &S,
    report: &mut IngestReport,
    endpoint: Endpoint,
    key: String,
    payload: &Value,
) -> Result<()> {
    let body = serde_json::to_vec(payload)?;
    let size = body.len();
    store.put(&key, body, JSON_CONTENT_TYPE).await?;
    tracing::info!(endpoint = %endpoint, key = %key, bytes = size, "Wrote raw payload");
    report.written.push(WrittenObject { endpoint, key });
    Ok(())
}

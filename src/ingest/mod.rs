//! Raw ingestion: fetch stats payloads and land them unmodified in a
//! date-partitioned key layout.

pub mod config;
pub mod keys;
pub mod runner;

pub use config::{IngestConfig, DEFAULT_RAW_PREFIX};
pub use keys::{media_key, new_part_id, page_key, Endpoint};
pub use runner::{run_ingestion, IngestReport, WrittenObject};

//! Pricewatch ingestion pipeline
//!
//! Takes the extraction layer's raw batches and lands them in the store:
//! fingerprint, upsert, tally, audit. Designed to be re-runnable on the same
//! input without creating duplicates.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod batch;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod stats;

pub use batch::load_batch;
pub use config::Config;
pub use error::PipelineError;
pub use pipeline::{IngestionPipeline, RunReport};
pub use stats::RunStats;

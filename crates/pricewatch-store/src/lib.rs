//! Pricewatch Store Library
//!
//! Postgres persistence for the dedup/upsert pipeline:
//!
//! - **RecordStore**: scraped listings keyed by content fingerprint, with
//!   atomic insert-or-update semantics and soft deactivation
//! - **FileStore**: downloaded files keyed by the hash of their bytes
//! - **EventLog**: append-only audit trail of pipeline runs
//!
//! The conflict-on-fingerprint path is never an error anywhere in this crate;
//! it is the defined upsert behavior.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod db;
pub mod events;
pub mod files;
pub mod models;
pub mod records;

pub use db::{create_pool, health_check, run_migrations, DbConfig, StoreError, StoreResult};
pub use events::{EventLog, PgEventLog};
pub use files::{FileStore, PgFileStore};
pub use models::{
    DownloadedFile, EventStatus, EventSummary, EventType, FileStats, NewDownloadedFile,
    NewPipelineEvent, NewScrapedRecord, PipelineEvent, RecordFilter, RecordStats, ScrapedRecord,
    UpsertOutcome,
};
pub use records::{PgRecordStore, RecordStore};

//! The ingestion pipeline
//!
//! Stateless orchestrator, invoked once per run: drives a freshly extracted
//! batch through fingerprinting and store upserts, tallies outcomes, and
//! appends exactly one terminating event to the audit log.
//!
//! A single bad item never aborts the batch: per-item failures are logged,
//! counted, and skipped. Each upsert is independently atomic, so a crashed
//! or cancelled run leaves only committed rows behind and the whole run can
//! be re-executed on the same input without creating duplicates.

use anyhow::Context;
use pricewatch_common::fingerprint::record_fingerprint;
use pricewatch_common::{ExtractionBatch, Fingerprint, RawFile, RawRecord};
use pricewatch_store::{
    EventLog, FileStore, NewDownloadedFile, NewPipelineEvent, NewScrapedRecord, RecordStore,
    UpsertOutcome,
};
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::stats::RunStats;

/// Summary handed back to the caller after a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub stats: RunStats,
    /// Id of the `run_completed` event this run appended.
    pub event_id: i64,
}

/// Orchestrates one batch through hashing, upsert, and event logging.
///
/// Owns no persistent state; the stores are injected at construction.
pub struct IngestionPipeline<R, F, E> {
    records: R,
    files: F,
    events: E,
}

impl<R, F, E> IngestionPipeline<R, F, E>
where
    R: RecordStore,
    F: FileStore,
    E: EventLog,
{
    pub fn new(records: R, files: F, events: E) -> Self {
        Self {
            records,
            files,
            events,
        }
    }

    /// Run the batch to completion.
    ///
    /// Returns `Err` only for unrecoverable, run-level failures (empty batch,
    /// store unreachable up front, terminating event unrecordable); those are
    /// written to the event log before they propagate, so the audit trail and
    /// the caller's view never disagree.
    #[tracing::instrument(skip_all, fields(records = batch.records.len(), files = batch.files.len()))]
    pub async fn run(&self, batch: &ExtractionBatch) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let mut stats = RunStats::new();

        tracing::info!(%run_id, "Starting ingestion run");

        if batch.is_empty() {
            return self.fail(stats, PipelineError::EmptyBatch).await;
        }

        // One probe up front separates "store is down" (run-level failure)
        // from per-item storage errors (counted and skipped).
        if let Err(e) = self.records.ping().await {
            return self
                .fail(stats, PipelineError::StoreUnavailable(e))
                .await;
        }

        for raw in &batch.records {
            match self.ingest_record(raw).await {
                Ok(outcome) if outcome.was_inserted => stats.inc_record_inserted(),
                Ok(_) => stats.inc_record_updated(),
                Err(e) => {
                    tracing::warn!(title = %raw.title, error = %e, "Skipping record");
                    stats.inc_record_failed();
                }
            }
        }

        for raw in &batch.files {
            match self.ingest_file(raw).await {
                Ok(outcome) if outcome.was_inserted => stats.inc_file_inserted(),
                Ok(_) => stats.inc_file_updated(),
                Err(e) => {
                    tracing::warn!(filename = %raw.filename, error = %e, "Skipping file");
                    stats.inc_file_failed();
                }
            }
        }

        stats.complete();

        let event = NewPipelineEvent::run_completed(
            format!(
                "Run completed. Records new: {}, updated: {}, failed: {}; files new: {}, updated: {}, failed: {}",
                stats.records_inserted,
                stats.records_updated,
                stats.records_failed,
                stats.files_inserted,
                stats.files_updated,
                stats.files_failed,
            ),
            stats.affected(),
            stats.duration_secs,
        );
        let event_id = self.events.append(&event).await?;

        tracing::info!(
            affected = stats.affected(),
            failed = stats.failed(),
            duration_secs = stats.duration_secs,
            "Ingestion run completed"
        );

        Ok(RunReport {
            run_id,
            stats,
            event_id,
        })
    }

    /// Record the run-level failure in the event log, then propagate it.
    /// If even the append fails the original error still wins; the gap in
    /// the audit trail is logged and diagnosable.
    async fn fail(
        &self,
        mut stats: RunStats,
        error: PipelineError,
    ) -> Result<RunReport, PipelineError> {
        stats.complete();

        let event = NewPipelineEvent::run_failed(
            "Ingestion run failed".to_string(),
            stats.duration_secs,
            error.to_string(),
        );
        if let Err(e) = self.events.append(&event).await {
            tracing::warn!(error = %e, "Failed to record run_failed event");
        }

        tracing::error!(error = %error, "Ingestion run failed");
        Err(error)
    }

    async fn ingest_record(&self, raw: &RawRecord) -> anyhow::Result<UpsertOutcome> {
        let record = prepare_record(raw)?;
        self.records
            .upsert(&record)
            .await
            .context("record upsert failed")
    }

    async fn ingest_file(&self, raw: &RawFile) -> anyhow::Result<UpsertOutcome> {
        let file = NewDownloadedFile {
            fingerprint: Fingerprint::of_bytes(&raw.bytes),
            filename: raw.filename.clone(),
            storage_path: raw.storage_path.clone(),
            mime_type: raw.mime_type.clone(),
            size_bytes: raw.bytes.len() as i64,
            source_url: raw.source_url.clone(),
        };
        self.files.upsert(&file).await.context("file upsert failed")
    }
}

/// Validate a raw record at the ingestion boundary and attach its identity.
///
/// The price is rendered once to its shortest decimal string and both the
/// fingerprint and the stored NUMERIC derive from that same string, so hash
/// input and stored value cannot diverge.
fn prepare_record(raw: &RawRecord) -> anyhow::Result<NewScrapedRecord> {
    if raw.title.trim().is_empty() {
        anyhow::bail!("title is empty");
    }
    if raw.url.trim().is_empty() {
        anyhow::bail!("source url is empty");
    }
    if let Some(d) = raw.discount_percent {
        if !(0..=100).contains(&d) {
            anyhow::bail!("discount_percent {} out of range 0..=100", d);
        }
    }
    if raw.quantity < 0 {
        anyhow::bail!("quantity {} is negative", raw.quantity);
    }
    if raw.page_number < 1 {
        anyhow::bail!("page_number {} is not 1-based", raw.page_number);
    }

    let price_repr = raw.price.map(decimal_repr).transpose()?;
    let original_price_repr = raw.original_price.map(decimal_repr).transpose()?;

    // Honor a fingerprint the extractor already computed; derive it from the
    // identity contract (title + price + source URL) otherwise.
    let fingerprint = raw
        .fingerprint
        .as_deref()
        .and_then(Fingerprint::parse)
        .unwrap_or_else(|| record_fingerprint(&raw.title, price_repr.as_deref(), &raw.url));

    Ok(NewScrapedRecord {
        fingerprint,
        title: raw.title.clone(),
        price: parse_decimal(price_repr)?,
        original_price: parse_decimal(original_price_repr)?,
        discount_percent: raw.discount_percent,
        quantity: raw.quantity,
        page_number: raw.page_number,
        source_url: raw.url.clone(),
        image_url: raw.image_url.clone(),
        description: raw.description.clone(),
        category: raw.category.clone(),
    })
}

fn decimal_repr(value: f64) -> anyhow::Result<String> {
    if !value.is_finite() {
        anyhow::bail!("price {} is not a finite number", value);
    }
    Ok(value.to_string())
}

fn parse_decimal(repr: Option<String>) -> anyhow::Result<Option<BigDecimal>> {
    repr.map(|s| {
        s.parse::<BigDecimal>()
            .with_context(|| format!("unparseable decimal '{}'", s))
    })
    .transpose()
}

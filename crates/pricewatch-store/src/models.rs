//! Persistent row types and store result shapes

use chrono::{DateTime, Utc};
use pricewatch_common::Fingerprint;
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;

use crate::db::StoreError;

/// A stored scraped listing.
///
/// Created on first sighting of a fingerprint; on re-sighting only `price`
/// and `last_modified` move. Never hard-deleted: retirement is the soft
/// `is_active` flag.
#[derive(Debug, Clone)]
pub struct ScrapedRecord {
    pub id: i64,
    pub fingerprint: Fingerprint,
    pub title: String,
    pub price: Option<BigDecimal>,
    pub original_price: Option<BigDecimal>,
    pub discount_percent: Option<i32>,
    pub quantity: i32,
    pub page_number: i32,
    pub source_url: String,
    pub image_url: Option<String>,
    pub description: String,
    pub category: String,
    pub is_active: bool,
    pub scraped_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// Insert payload for a scraped listing (store assigns id and timestamps).
#[derive(Debug, Clone)]
pub struct NewScrapedRecord {
    pub fingerprint: Fingerprint,
    pub title: String,
    pub price: Option<BigDecimal>,
    pub original_price: Option<BigDecimal>,
    pub discount_percent: Option<i32>,
    pub quantity: i32,
    pub page_number: i32,
    pub source_url: String,
    pub image_url: Option<String>,
    pub description: String,
    pub category: String,
}

/// A stored downloaded file. Identity is the content hash of the bytes.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub id: i64,
    pub fingerprint: Fingerprint,
    pub filename: String,
    pub storage_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub source_url: String,
    pub is_active: bool,
    pub scraped_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// Insert payload for a downloaded file.
#[derive(Debug, Clone)]
pub struct NewDownloadedFile {
    pub fingerprint: Fingerprint,
    pub filename: String,
    pub storage_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub source_url: String,
}

/// Result of one atomic insert-or-update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: i64,
    /// True when the fingerprint was unseen and a new row was created;
    /// false when an existing row was refreshed.
    pub was_inserted: bool,
}

/// Kind of pipeline event. Extensible: values this build doesn't know are
/// preserved as `Other` when read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RunCompleted,
    RunFailed,
    #[serde(untagged)]
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::RunCompleted => "run_completed",
            EventType::RunFailed => "run_failed",
            EventType::Other(s) => s,
        }
    }

    pub fn from_db(value: String) -> Self {
        match value.as_str() {
            "run_completed" => EventType::RunCompleted,
            "run_failed" => EventType::RunFailed,
            _ => EventType::Other(value),
        }
    }
}

/// Outcome status of a pipeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Success,
    Error,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Success => "success",
            EventStatus::Error => "error",
        }
    }

    pub fn from_db(value: &str) -> Result<Self, StoreError> {
        match value {
            "success" => Ok(EventStatus::Success),
            "error" => Ok(EventStatus::Error),
            other => Err(StoreError::Decode(format!(
                "unknown event status '{}'",
                other
            ))),
        }
    }
}

/// One audit-trail entry: the terminal record of a single pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineEvent {
    pub id: i64,
    pub event_type: EventType,
    pub description: String,
    pub affected_records: i64,
    pub execution_time_seconds: f64,
    pub status: EventStatus,
    pub error_message: Option<String>,
    pub event_date: DateTime<Utc>,
}

/// Append payload for the event log.
#[derive(Debug, Clone)]
pub struct NewPipelineEvent {
    pub event_type: EventType,
    pub description: String,
    pub affected_records: i64,
    pub execution_time_seconds: f64,
    pub status: EventStatus,
    pub error_message: Option<String>,
}

impl NewPipelineEvent {
    pub fn run_completed(description: String, affected_records: i64, duration_secs: f64) -> Self {
        Self {
            event_type: EventType::RunCompleted,
            description,
            affected_records,
            execution_time_seconds: duration_secs,
            status: EventStatus::Success,
            error_message: None,
        }
    }

    pub fn run_failed(description: String, duration_secs: f64, error_message: String) -> Self {
        Self {
            event_type: EventType::RunFailed,
            description,
            affected_records: 0,
            execution_time_seconds: duration_secs,
            status: EventStatus::Error,
            error_message: Some(error_message),
        }
    }
}

/// Listing filter for `RecordStore::list_active`.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub category: Option<String>,
}

/// Aggregates over `scraped_records`.
#[derive(Debug, Clone)]
pub struct RecordStats {
    pub active_count: i64,
    pub inactive_count: i64,
    pub distinct_category_count: i64,
    /// Average over active rows with a non-null price.
    pub average_price: Option<BigDecimal>,
    pub most_recent_last_modified: Option<DateTime<Utc>>,
}

/// Aggregates over active `scraped_files`.
#[derive(Debug, Clone)]
pub struct FileStats {
    pub total_count: i64,
    pub total_size_bytes: i64,
    pub distinct_mime_type_count: i64,
}

/// 24-hour event-log roll-up.
#[derive(Debug, Clone)]
pub struct EventSummary {
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_round_trip() {
        assert_eq!(EventType::RunCompleted.as_str(), "run_completed");
        assert_eq!(
            EventType::from_db("run_completed".to_string()),
            EventType::RunCompleted
        );
        assert_eq!(
            EventType::from_db("deactivation_sweep".to_string()),
            EventType::Other("deactivation_sweep".to_string())
        );
    }

    #[test]
    fn test_event_status_round_trip() {
        assert_eq!(EventStatus::Success.as_str(), "success");
        assert_eq!(EventStatus::from_db("error").unwrap(), EventStatus::Error);
        assert!(EventStatus::from_db("maybe").is_err());
    }

    #[test]
    fn test_event_constructors() {
        let ok = NewPipelineEvent::run_completed("done".to_string(), 7, 1.5);
        assert_eq!(ok.event_type, EventType::RunCompleted);
        assert_eq!(ok.status, EventStatus::Success);
        assert_eq!(ok.affected_records, 7);
        assert!(ok.error_message.is_none());

        let failed = NewPipelineEvent::run_failed("boom".to_string(), 0.5, "db down".to_string());
        assert_eq!(failed.event_type, EventType::RunFailed);
        assert_eq!(failed.status, EventStatus::Error);
        assert_eq!(failed.error_message.as_deref(), Some("db down"));
    }
}

//! Statistics collected during one pipeline run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-run outcome tallies.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunStats {
    /// Records stored for the first time
    pub records_inserted: i64,
    /// Records whose fingerprint was already known (price refreshed)
    pub records_updated: i64,
    /// Records that failed validation or storage
    pub records_failed: i64,
    /// Files stored for the first time
    pub files_inserted: i64,
    /// Files whose bytes were already known
    pub files_updated: i64,
    /// Files that failed storage
    pub files_failed: i64,
    /// Wall-clock duration of the run in seconds
    pub duration_secs: f64,
    /// Start time
    pub started_at: Option<DateTime<Utc>>,
    /// End time
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunStats {
    /// Create new stats with the clock started
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Stop the clock and fix the duration
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
        if let (Some(start), Some(end)) = (self.started_at, self.completed_at) {
            self.duration_secs = (end - start).num_milliseconds() as f64 / 1000.0;
        }
    }

    pub fn inc_record_inserted(&mut self) {
        self.records_inserted += 1;
    }

    pub fn inc_record_updated(&mut self) {
        self.records_updated += 1;
    }

    pub fn inc_record_failed(&mut self) {
        self.records_failed += 1;
    }

    pub fn inc_file_inserted(&mut self) {
        self.files_inserted += 1;
    }

    pub fn inc_file_updated(&mut self) {
        self.files_updated += 1;
    }

    pub fn inc_file_failed(&mut self) {
        self.files_failed += 1;
    }

    /// Records and files created-or-updated in this run; what the run's
    /// terminating event reports as `affected_records`.
    pub fn affected(&self) -> i64 {
        self.records_inserted + self.records_updated + self.files_inserted + self.files_updated
    }

    pub fn failed(&self) -> i64 {
        self.records_failed + self.files_failed
    }

    pub fn total(&self) -> i64 {
        self.affected() + self.failed()
    }

    /// Share of processed items that were stored, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total() > 0 {
            (self.affected() as f64 / self.total() as f64) * 100.0
        } else {
            0.0
        }
    }
}

//! Pipeline event log
//!
//! Append-only audit trail: one row per pipeline run. There are no update
//! or delete operations on purpose; the log is forensic, not mutable state.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::db::{StoreError, StoreResult};
use crate::models::{EventStatus, EventSummary, EventType, NewPipelineEvent, PipelineEvent};

/// Maximum rows one `recent` call will return.
pub const MAX_RECENT_LIMIT: i64 = 500;

#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append one event. Pure insert; every call produces a new row.
    async fn append(&self, event: &NewPipelineEvent) -> StoreResult<i64>;

    /// Latest events, `event_date` descending. `limit` is clamped to
    /// `1..=MAX_RECENT_LIMIT`.
    async fn recent(&self, limit: i64) -> StoreResult<Vec<PipelineEvent>>;

    /// Events appended in the last 24 hours, optionally restricted to one
    /// status.
    async fn count_last_24h(&self, status: Option<EventStatus>) -> StoreResult<i64>;

    /// Total/success/error roll-up over the last 24 hours.
    async fn summary_last_24h(&self) -> StoreResult<EventSummary>;
}

/// Postgres-backed [`EventLog`].
#[derive(Debug, Clone)]
pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLog for PgEventLog {
    #[tracing::instrument(skip(self, event), fields(event_type = event.event_type.as_str()))]
    async fn append(&self, event: &NewPipelineEvent) -> StoreResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO pipeline_events (
                event_type, description, affected_records,
                execution_time_seconds, status, error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(event.event_type.as_str())
        .bind(&event.description)
        .bind(event.affected_records)
        .bind(event.execution_time_seconds)
        .bind(event.status.as_str())
        .bind(&event.error_message)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(id, "Pipeline event appended");

        Ok(id)
    }

    async fn recent(&self, limit: i64) -> StoreResult<Vec<PipelineEvent>> {
        let limit = limit.clamp(1, MAX_RECENT_LIMIT);

        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, event_type, description, affected_records,
                   execution_time_seconds, status, error_message, event_date
            FROM pipeline_events
            ORDER BY event_date DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PipelineEvent::try_from).collect()
    }

    async fn count_last_24h(&self, status: Option<EventStatus>) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM pipeline_events
            WHERE event_date > NOW() - INTERVAL '24 hours'
              AND ($1::TEXT IS NULL OR status = $1)
            "#,
        )
        .bind(status.map(EventStatus::as_str))
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn summary_last_24h(&self) -> StoreResult<EventSummary> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'success') AS successful,
                COUNT(*) FILTER (WHERE status = 'error') AS failed
            FROM pipeline_events
            WHERE event_date > NOW() - INTERVAL '24 hours'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(EventSummary {
            total: row.try_get("total")?,
            successful: row.try_get("successful")?,
            failed: row.try_get("failed")?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: i64,
    event_type: String,
    description: String,
    affected_records: i64,
    execution_time_seconds: f64,
    status: String,
    error_message: Option<String>,
    event_date: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<EventRow> for PipelineEvent {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            event_type: EventType::from_db(row.event_type),
            description: row.description,
            affected_records: row.affected_records,
            execution_time_seconds: row.execution_time_seconds,
            status: EventStatus::from_db(&row.status)?,
            error_message: row.error_message,
            event_date: row.event_date,
        })
    }
}

//! Scraped-record persistence
//!
//! The upsert is a single atomic `INSERT .. ON CONFLICT` statement, never a
//! read-then-write pair, so concurrent runs can re-sight the same fingerprint
//! without ever duplicating a row. On conflict only `price` and
//! `last_modified` move: the fingerprint already encodes title and URL, so
//! the non-price fields are treated as already correct.

use async_trait::async_trait;
use pricewatch_common::Fingerprint;
use sqlx::{PgPool, Row};

use crate::db::{StoreError, StoreResult};
use crate::models::{
    NewScrapedRecord, RecordFilter, RecordStats, ScrapedRecord, UpsertOutcome,
};

/// Maximum rows one `list_active` call will return.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Persistent table of scraped listings keyed by fingerprint.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert the record, or refresh `price` + `last_modified` if the
    /// fingerprint already exists. Atomic per record.
    async fn upsert(&self, record: &NewScrapedRecord) -> StoreResult<UpsertOutcome>;

    /// Active records ordered by `scraped_at` descending. `page` is 1-based;
    /// `page_size` is clamped to `1..=MAX_PAGE_SIZE`.
    async fn list_active(
        &self,
        filter: &RecordFilter,
        page: i64,
        page_size: i64,
    ) -> StoreResult<Vec<ScrapedRecord>>;

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<ScrapedRecord>>;

    /// Distinct categories among active records.
    async fn distinct_categories(&self) -> StoreResult<Vec<String>>;

    async fn aggregate_stats(&self) -> StoreResult<RecordStats>;

    /// Soft-deactivate active records whose fingerprint is not in `seen`.
    /// Never called by the pipeline itself; the retention policy belongs to
    /// the collaborator that owns the full picture of a scrape cycle.
    async fn deactivate_unseen(&self, seen: &[Fingerprint]) -> StoreResult<u64>;

    /// Cheap connectivity probe.
    async fn ping(&self) -> StoreResult<()>;
}

/// Postgres-backed [`RecordStore`].
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[tracing::instrument(skip(self, record), fields(fingerprint = %record.fingerprint))]
    async fn upsert(&self, record: &NewScrapedRecord) -> StoreResult<UpsertOutcome> {
        // xmax = 0 only holds for a freshly inserted row version, which is
        // how we learn insert-vs-update from the single round-trip.
        let row = sqlx::query(
            r#"
            INSERT INTO scraped_records (
                fingerprint, title, price, original_price, discount_percent,
                quantity, page_number, source_url, image_url, description, category
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (fingerprint) DO UPDATE SET
                price = EXCLUDED.price,
                last_modified = NOW()
            RETURNING id, (xmax = 0) AS was_inserted
            "#,
        )
        .bind(record.fingerprint.as_str())
        .bind(&record.title)
        .bind(&record.price)
        .bind(&record.original_price)
        .bind(record.discount_percent)
        .bind(record.quantity)
        .bind(record.page_number)
        .bind(&record.source_url)
        .bind(&record.image_url)
        .bind(&record.description)
        .bind(&record.category)
        .fetch_one(&self.pool)
        .await?;

        let outcome = UpsertOutcome {
            id: row.try_get("id")?,
            was_inserted: row.try_get("was_inserted")?,
        };

        tracing::debug!(
            id = outcome.id,
            was_inserted = outcome.was_inserted,
            "Record upserted"
        );

        Ok(outcome)
    }

    async fn list_active(
        &self,
        filter: &RecordFilter,
        page: i64,
        page_size: i64,
    ) -> StoreResult<Vec<ScrapedRecord>> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1) * page_size;

        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, fingerprint, title, price, original_price, discount_percent,
                   quantity, page_number, source_url, image_url, description,
                   category, is_active, scraped_at, last_modified
            FROM scraped_records
            WHERE is_active
              AND ($1::TEXT IS NULL OR category = $1)
            ORDER BY scraped_at DESC, id DESC
            LIMIT $2
            OFFSET $3
            "#,
        )
        .bind(filter.category.as_deref())
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ScrapedRecord::from).collect())
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<ScrapedRecord>> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, fingerprint, title, price, original_price, discount_percent,
                   quantity, page_number, source_url, image_url, description,
                   category, is_active, scraped_at, last_modified
            FROM scraped_records
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ScrapedRecord::from))
    }

    async fn distinct_categories(&self) -> StoreResult<Vec<String>> {
        let categories = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT category
            FROM scraped_records
            WHERE is_active
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn aggregate_stats(&self) -> StoreResult<RecordStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE is_active) AS active_count,
                COUNT(*) FILTER (WHERE NOT is_active) AS inactive_count,
                COUNT(DISTINCT category) FILTER (WHERE is_active) AS distinct_category_count,
                AVG(price) FILTER (WHERE is_active) AS average_price,
                MAX(last_modified) AS most_recent_last_modified
            FROM scraped_records
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(RecordStats {
            active_count: row.try_get("active_count")?,
            inactive_count: row.try_get("inactive_count")?,
            distinct_category_count: row.try_get("distinct_category_count")?,
            average_price: row.try_get("average_price")?,
            most_recent_last_modified: row.try_get("most_recent_last_modified")?,
        })
    }

    #[tracing::instrument(skip(self, seen), fields(seen_count = seen.len()))]
    async fn deactivate_unseen(&self, seen: &[Fingerprint]) -> StoreResult<u64> {
        let seen: Vec<String> = seen.iter().map(|fp| fp.as_str().to_string()).collect();

        let result = sqlx::query(
            r#"
            UPDATE scraped_records
            SET is_active = FALSE
            WHERE is_active
              AND NOT (fingerprint = ANY($1))
            "#,
        )
        .bind(&seen)
        .execute(&self.pool)
        .await?;

        let deactivated = result.rows_affected();
        tracing::info!(deactivated, "Deactivated records no longer observed");

        Ok(deactivated)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(StoreError::from)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
    id: i64,
    fingerprint: String,
    title: String,
    price: Option<sqlx::types::BigDecimal>,
    original_price: Option<sqlx::types::BigDecimal>,
    discount_percent: Option<i32>,
    quantity: i32,
    page_number: i32,
    source_url: String,
    image_url: Option<String>,
    description: String,
    category: String,
    is_active: bool,
    scraped_at: chrono::DateTime<chrono::Utc>,
    last_modified: chrono::DateTime<chrono::Utc>,
}

impl From<RecordRow> for ScrapedRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            id: row.id,
            fingerprint: Fingerprint::from(row.fingerprint),
            title: row.title,
            price: row.price,
            original_price: row.original_price,
            discount_percent: row.discount_percent,
            quantity: row.quantity,
            page_number: row.page_number,
            source_url: row.source_url,
            image_url: row.image_url,
            description: row.description,
            category: row.category,
            is_active: row.is_active,
            scraped_at: row.scraped_at,
            last_modified: row.last_modified,
        }
    }
}

//! Downloaded-file persistence
//!
//! Same upsert contract as the record store, keyed by the content hash of
//! the file bytes. Re-downloading identical bytes (from any URL) only
//! refreshes `last_modified`.

use async_trait::async_trait;
use pricewatch_common::Fingerprint;
use sqlx::{PgPool, Row};

use crate::db::{StoreError, StoreResult};
use crate::models::{DownloadedFile, FileStats, NewDownloadedFile, UpsertOutcome};

/// Persistent table of downloaded files keyed by content fingerprint.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Insert the file, or touch `last_modified` if identical bytes were
    /// already stored. Atomic per file.
    async fn upsert(&self, file: &NewDownloadedFile) -> StoreResult<UpsertOutcome>;

    /// Active files ordered by `scraped_at` descending.
    async fn list_active(&self) -> StoreResult<Vec<DownloadedFile>>;

    /// Aggregates over active files.
    async fn aggregate_stats(&self) -> StoreResult<FileStats>;

    /// Cheap connectivity probe.
    async fn ping(&self) -> StoreResult<()>;
}

/// Postgres-backed [`FileStore`].
#[derive(Debug, Clone)]
pub struct PgFileStore {
    pool: PgPool,
}

impl PgFileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileStore for PgFileStore {
    #[tracing::instrument(skip(self, file), fields(fingerprint = %file.fingerprint))]
    async fn upsert(&self, file: &NewDownloadedFile) -> StoreResult<UpsertOutcome> {
        let row = sqlx::query(
            r#"
            INSERT INTO scraped_files (
                fingerprint, filename, storage_path, mime_type, size_bytes, source_url
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (fingerprint) DO UPDATE SET
                last_modified = NOW()
            RETURNING id, (xmax = 0) AS was_inserted
            "#,
        )
        .bind(file.fingerprint.as_str())
        .bind(&file.filename)
        .bind(&file.storage_path)
        .bind(&file.mime_type)
        .bind(file.size_bytes)
        .bind(&file.source_url)
        .fetch_one(&self.pool)
        .await?;

        let outcome = UpsertOutcome {
            id: row.try_get("id")?,
            was_inserted: row.try_get("was_inserted")?,
        };

        tracing::debug!(
            id = outcome.id,
            was_inserted = outcome.was_inserted,
            "File upserted"
        );

        Ok(outcome)
    }

    async fn list_active(&self) -> StoreResult<Vec<DownloadedFile>> {
        let rows = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT id, fingerprint, filename, storage_path, mime_type,
                   size_bytes, source_url, is_active, scraped_at, last_modified
            FROM scraped_files
            WHERE is_active
            ORDER BY scraped_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DownloadedFile::from).collect())
    }

    async fn aggregate_stats(&self) -> StoreResult<FileStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_count,
                COALESCE(SUM(size_bytes), 0)::BIGINT AS total_size_bytes,
                COUNT(DISTINCT mime_type) AS distinct_mime_type_count
            FROM scraped_files
            WHERE is_active
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(FileStats {
            total_count: row.try_get("total_count")?,
            total_size_bytes: row.try_get("total_size_bytes")?,
            distinct_mime_type_count: row.try_get("distinct_mime_type_count")?,
        })
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
struct FileRow {
    id: i64,
    fingerprint: String,
    filename: String,
    storage_path: String,
    mime_type: String,
    size_bytes: i64,
    source_url: String,
    is_active: bool,
    scraped_at: chrono::DateTime<chrono::Utc>,
    last_modified: chrono::DateTime<chrono::Utc>,
}

impl From<FileRow> for DownloadedFile {
    fn from(row: FileRow) -> Self {
        Self {
            id: row.id,
            fingerprint: Fingerprint::from(row.fingerprint),
            filename: row.filename,
            storage_path: row.storage_path,
            mime_type: row.mime_type,
            size_bytes: row.size_bytes,
            source_url: row.source_url,
            is_active: row.is_active,
            scraped_at: row.scraped_at,
            last_modified: row.last_modified,
        }
    }
}

//! Postgres-backed store tests.
//!
//! These need a reachable database: set `DATABASE_URL` and run with
//! `cargo test -p pricewatch-store -- --ignored`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pricewatch_common::fingerprint::record_fingerprint;
use pricewatch_common::Fingerprint;
use pricewatch_store::{
    create_pool, run_migrations, DbConfig, EventLog, EventStatus, FileStore, NewDownloadedFile,
    NewPipelineEvent, NewScrapedRecord, PgEventLog, PgFileStore, PgRecordStore, RecordFilter,
    RecordStore,
};
use sqlx::types::BigDecimal;
use sqlx::PgPool;

async fn test_pool() -> PgPool {
    let config = DbConfig::from_env().expect("DATABASE_URL must be set for integration tests");
    let pool = create_pool(&config).await.unwrap();
    run_migrations(&pool).await.unwrap();
    sqlx::query("TRUNCATE scraped_records, scraped_files, pipeline_events RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();
    pool
}

fn record(title: &str, price: Option<&str>, url: &str) -> NewScrapedRecord {
    NewScrapedRecord {
        fingerprint: record_fingerprint(title, price, url),
        title: title.to_string(),
        price: price.map(|p| p.parse::<BigDecimal>().unwrap()),
        original_price: None,
        discount_percent: None,
        quantity: 1,
        page_number: 1,
        source_url: url.to_string(),
        image_url: None,
        description: String::new(),
        category: "laptops".to_string(),
    }
}

fn file(name: &str, bytes: &[u8], url: &str) -> NewDownloadedFile {
    NewDownloadedFile {
        fingerprint: Fingerprint::of_bytes(bytes),
        filename: name.to_string(),
        storage_path: format!("downloads/{name}"),
        mime_type: "application/pdf".to_string(),
        size_bytes: bytes.len() as i64,
        source_url: url.to_string(),
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn upsert_is_idempotent() {
    let pool = test_pool().await;
    let store = PgRecordStore::new(pool.clone());

    let r = record("Laptop", Some("999.99"), "https://e.com/1");
    let first = store.upsert(&r).await.unwrap();
    let second = store.upsert(&r).await.unwrap();

    assert!(first.was_inserted);
    assert!(!second.was_inserted);
    assert_eq!(first.id, second.id);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scraped_records")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn conflict_updates_price_only() {
    let pool = test_pool().await;
    let store = PgRecordStore::new(pool.clone());

    let mut r = record("Laptop", Some("100"), "https://e.com/1");
    r.description = "original description".to_string();
    let first = store.upsert(&r).await.unwrap();

    // Same fingerprint (price is hashed from the same string the caller
    // supplies), but every non-identity field changed.
    let mut resighted = r.clone();
    resighted.price = Some("120".parse().unwrap());
    resighted.description = "changed description".to_string();
    resighted.quantity = 5;
    let second = store.upsert(&resighted).await.unwrap();
    assert!(!second.was_inserted);

    let stored = store.get_by_id(first.id).await.unwrap().unwrap();
    assert_eq!(stored.price, Some("120".parse().unwrap()));
    assert_eq!(stored.description, "original description");
    assert_eq!(stored.quantity, 1);
    assert!(stored.last_modified >= stored.scraped_at);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn concurrent_upserts_same_fingerprint_yield_one_row() {
    let pool = test_pool().await;
    let store = PgRecordStore::new(pool.clone());

    let a = record("Laptop", Some("100"), "https://e.com/1");
    let b = a.clone();

    let (ra, rb) = tokio::join!(store.upsert(&a), store.upsert(&b));
    ra.unwrap();
    rb.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scraped_records")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn pagination_returns_descending_pages() {
    let pool = test_pool().await;
    let store = PgRecordStore::new(pool.clone());

    for i in 0..25 {
        store
            .upsert(&record(
                &format!("Item {i}"),
                Some("10"),
                &format!("https://e.com/{i}"),
            ))
            .await
            .unwrap();
    }

    let page2 = store
        .list_active(&RecordFilter::default(), 2, 10)
        .await
        .unwrap();
    assert_eq!(page2.len(), 10);
    // scraped_at descending with id tie-break: page 2 holds rows 15..=6.
    assert_eq!(page2.first().unwrap().id, 15);
    assert_eq!(page2.last().unwrap().id, 6);

    let page3 = store
        .list_active(&RecordFilter::default(), 3, 10)
        .await
        .unwrap();
    assert_eq!(page3.len(), 5);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn category_filter_and_distinct_categories() {
    let pool = test_pool().await;
    let store = PgRecordStore::new(pool.clone());

    let mut phone = record("Phone", Some("500"), "https://e.com/p");
    phone.category = "phones".to_string();
    store.upsert(&phone).await.unwrap();
    store
        .upsert(&record("Laptop", Some("900"), "https://e.com/l"))
        .await
        .unwrap();

    let filter = RecordFilter {
        category: Some("phones".to_string()),
    };
    let phones = store.list_active(&filter, 1, 10).await.unwrap();
    assert_eq!(phones.len(), 1);
    assert_eq!(phones[0].title, "Phone");

    let categories = store.distinct_categories().await.unwrap();
    assert_eq!(categories, vec!["laptops".to_string(), "phones".to_string()]);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn deactivate_unseen_and_aggregate_stats() {
    let pool = test_pool().await;
    let store = PgRecordStore::new(pool.clone());

    let keep = record("Keep", Some("100"), "https://e.com/keep");
    let gone = record("Gone", Some("300"), "https://e.com/gone");
    store.upsert(&keep).await.unwrap();
    store.upsert(&gone).await.unwrap();

    let deactivated = store
        .deactivate_unseen(std::slice::from_ref(&keep.fingerprint))
        .await
        .unwrap();
    assert_eq!(deactivated, 1);

    let stats = store.aggregate_stats().await.unwrap();
    assert_eq!(stats.active_count, 1);
    assert_eq!(stats.inactive_count, 1);
    assert_eq!(stats.distinct_category_count, 1);
    assert_eq!(stats.average_price, Some("100".parse().unwrap()));
    assert!(stats.most_recent_last_modified.is_some());

    // Deactivated rows disappear from listings.
    let listed = store
        .list_active(&RecordFilter::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Keep");
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn file_upsert_dedupes_identical_bytes() {
    let pool = test_pool().await;
    let store = PgFileStore::new(pool.clone());

    // Same bytes from two different URLs collapse to one row.
    let first = store
        .upsert(&file("report.pdf", b"pdf-bytes", "https://a.com/r.pdf"))
        .await
        .unwrap();
    let second = store
        .upsert(&file("copy.pdf", b"pdf-bytes", "https://b.com/c.pdf"))
        .await
        .unwrap();

    assert!(first.was_inserted);
    assert!(!second.was_inserted);
    assert_eq!(first.id, second.id);

    let files = store.list_active().await.unwrap();
    assert_eq!(files.len(), 1);
    // Non-identity metadata is left untouched on conflict.
    assert_eq!(files[0].filename, "report.pdf");

    let stats = store.aggregate_stats().await.unwrap();
    assert_eq!(stats.total_count, 1);
    assert_eq!(stats.total_size_bytes, b"pdf-bytes".len() as i64);
    assert_eq!(stats.distinct_mime_type_count, 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn event_log_appends_and_counts() {
    let pool = test_pool().await;
    let log = PgEventLog::new(pool.clone());

    log.append(&NewPipelineEvent::run_completed(
        "run ok".to_string(),
        12,
        1.25,
    ))
    .await
    .unwrap();
    log.append(&NewPipelineEvent::run_failed(
        "run failed".to_string(),
        0.5,
        "store unreachable".to_string(),
    ))
    .await
    .unwrap();

    let recent = log.recent(10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].error_message.as_deref(), Some("store unreachable"));
    assert_eq!(recent[1].affected_records, 12);

    assert_eq!(log.count_last_24h(None).await.unwrap(), 2);
    assert_eq!(
        log.count_last_24h(Some(EventStatus::Success)).await.unwrap(),
        1
    );
    assert_eq!(
        log.count_last_24h(Some(EventStatus::Error)).await.unwrap(),
        1
    );

    let summary = log.summary_last_24h().await.unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 1);
}

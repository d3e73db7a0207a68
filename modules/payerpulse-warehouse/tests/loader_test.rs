//! Integration tests for WarehouseLoader.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::PgPool;

use payerpulse_common::{SentimentLabel, TransformedPost};
use payerpulse_warehouse::{schema, WarehouseLoader};

/// Get a migrated, empty test database pool, or skip if none is available.
async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;

    schema::migrate(&pool).await.ok()?;

    // Clean slate for each test
    sqlx::query(
        "TRUNCATE post_payers, post_procedures, post_topics, posts, authors, \
         payers, procedures, topics RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .ok()?;

    // Static dimensions the test posts reference
    for (table, code, name) in [
        ("payers", "UHC", "UnitedHealthcare"),
        ("payers", "AETNA", "Aetna"),
        ("procedures", "PRIOR_AUTH", "Prior authorization"),
        ("topics", "DENIAL", "Claim denial"),
    ] {
        sqlx::query(&format!(
            "INSERT INTO {table} (code, display_name) VALUES ($1, $2)"
        ))
        .bind(code)
        .bind(name)
        .execute(&pool)
        .await
        .ok()?;
    }

    Some(pool)
}

fn codes(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn posted_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap()
}

fn sample_post(platform_post_id: &str) -> TransformedPost {
    TransformedPost {
        platform_post_id: platform_post_id.to_string(),
        author_natural_key: "author-1".to_string(),
        author_name: "Jordan Reyes".to_string(),
        author_title: Some("Practice Manager".to_string()),
        author_profile_url: None,
        is_physician: false,
        posted_at: posted_at(),
        content: "UHC denied our prior auth again".to_string(),
        sentiment_score: -0.6,
        sentiment_label: SentimentLabel::Negative,
        likes: 10,
        comments: 5,
        reposts: 2,
        impact_score: 26.0,
        matched_payers: codes(&["UHC"]),
        matched_procedures: codes(&["PRIOR_AUTH"]),
        matched_topics: codes(&["DENIAL"]),
    }
}

async fn count(pool: &PgPool, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .fetch_one(pool)
        .await
        .unwrap()
}

// =========================================================================
// Idempotency
// =========================================================================

#[tokio::test]
async fn loading_twice_produces_one_fact_row() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let loader = WarehouseLoader::new(pool.clone());
    let post = sample_post("post-1");

    loader.load_post(&post).await.unwrap();
    loader.load_post(&post).await.unwrap();

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM posts").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM post_payers").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM post_procedures").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM post_topics").await, 1);
}

#[tokio::test]
async fn bridge_rows_match_current_sets_after_reprocessing() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let loader = WarehouseLoader::new(pool.clone());

    let mut post = sample_post("post-2");
    loader.load_post(&post).await.unwrap();

    // Reprocessed version now mentions Aetna instead of UHC
    post.matched_payers = codes(&["AETNA"]);
    loader.load_post(&post).await.unwrap();

    let payer_codes: Vec<String> =
        sqlx::query_scalar("SELECT payer_code FROM post_payers ORDER BY payer_code")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(payer_codes, vec!["AETNA".to_string()]);
}

#[tokio::test]
async fn emptied_match_set_removes_all_bridge_rows() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let loader = WarehouseLoader::new(pool.clone());

    let mut post = sample_post("post-3");
    loader.load_post(&post).await.unwrap();

    post.matched_payers = BTreeSet::new();
    post.matched_topics = BTreeSet::new();
    loader.load_post(&post).await.unwrap();

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM post_payers").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM post_topics").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM post_procedures").await, 1);
}

#[tokio::test]
async fn unknown_dimension_code_fails_and_rolls_back() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let loader = WarehouseLoader::new(pool.clone());

    // CIGNA is not seeded, so the bridge insert violates its foreign key
    // after the author and fact rows were already written in the same
    // transaction. Nothing may survive the rollback.
    let mut post = sample_post("post-9");
    post.matched_payers = codes(&["CIGNA"]);

    let err = loader.load_post(&post).await.unwrap_err();
    assert!(matches!(err, payerpulse_warehouse::LoadError::Database(_)));

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM posts").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM authors").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM post_payers").await, 0);
}

// =========================================================================
// Fact reprocessing
// =========================================================================

#[tokio::test]
async fn reprocessing_is_last_write_wins() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let loader = WarehouseLoader::new(pool.clone());

    let mut post = sample_post("post-4");
    loader.load_post(&post).await.unwrap();

    post.content = "Update: UHC approved the appeal".to_string();
    post.sentiment_score = 0.5;
    post.sentiment_label = SentimentLabel::Positive;
    post.likes = 50;
    post.impact_score = 66.0;
    loader.load_post(&post).await.unwrap();

    let (content, label, likes): (String, String, i64) = sqlx::query_as(
        "SELECT content, sentiment_label, likes FROM posts WHERE platform_post_id = 'post-4'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(content, "Update: UHC approved the appeal");
    assert_eq!(label, "positive");
    assert_eq!(likes, 50);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM posts").await, 1);
}

// =========================================================================
// Author dimension
// =========================================================================

#[tokio::test]
async fn author_keeps_first_seen_and_latest_attributes() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let loader = WarehouseLoader::new(pool.clone());

    loader.load_post(&sample_post("post-5")).await.unwrap();

    let first_seen: DateTime<Utc> =
        sqlx::query_scalar("SELECT first_seen_at FROM authors WHERE author_key = 'author-1'")
            .fetch_one(&pool)
            .await
            .unwrap();

    let mut later = sample_post("post-6");
    later.author_name = "Jordan Reyes, MD".to_string();
    later.author_title = Some("Cardiologist, MD".to_string());
    later.is_physician = true;
    loader.load_post(&later).await.unwrap();

    let (name, is_physician, first_seen_after): (String, bool, DateTime<Utc>) = sqlx::query_as(
        "SELECT name, is_physician, first_seen_at FROM authors WHERE author_key = 'author-1'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM authors").await, 1);
    assert_eq!(name, "Jordan Reyes, MD");
    assert!(is_physician);
    assert_eq!(first_seen_after, first_seen);
}

#[tokio::test]
async fn concurrent_posts_from_same_author_create_one_row() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let loader = WarehouseLoader::new(pool.clone());

    let a = sample_post("post-7");
    let b = sample_post("post-8");
    let (ra, rb) = tokio::join!(loader.load_post(&a), loader.load_post(&b));
    ra.unwrap();
    rb.unwrap();

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM authors").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM posts").await, 2);
}

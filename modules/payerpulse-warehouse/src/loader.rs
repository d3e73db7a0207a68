//! Idempotent warehouse loading. One post per transaction: author dimension,
//! fact row keyed by platform_post_id, and bridge reconciliation commit
//! together or not at all.

use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;

use payerpulse_common::{EntityCategory, TransformedPost};

use crate::error::{LoadError, Result};
use crate::schema::bridge_table;

#[derive(Clone)]
pub struct WarehouseLoader {
    pool: PgPool,
}

impl WarehouseLoader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Make the warehouse reflect exactly this post. Re-running on the same
    /// input is a no-op beyond refreshed mutable attributes; reprocessing
    /// with changed content is last-write-wins.
    ///
    /// A uniqueness race during author resolution is expected under
    /// concurrent writers: the loser retries once and adopts the winner's
    /// row via the upsert's conflict arm.
    pub async fn load_post(&self, post: &TransformedPost) -> Result<()> {
        match self.try_load(post).await {
            Err(LoadError::Conflict(msg)) => {
                warn!(
                    platform_post_id = post.platform_post_id.as_str(),
                    conflict = msg.as_str(),
                    "Load conflict, retrying as lookup"
                );
                self.try_load(post).await
            }
            other => other,
        }
    }

    async fn try_load(&self, post: &TransformedPost) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let author_id = upsert_author(&mut tx, post).await?;
        let post_id = upsert_fact(&mut tx, author_id, post).await?;
        for category in [
            EntityCategory::Payer,
            EntityCategory::Procedure,
            EntityCategory::Topic,
        ] {
            reconcile_bridge(&mut tx, post_id, category, post).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Find-or-create the author by natural key as a single conflict-aware
/// statement. Mutable attributes are refreshed on every sighting;
/// first_seen_at is set by the database only on creation.
async fn upsert_author(
    tx: &mut Transaction<'_, Postgres>,
    post: &TransformedPost,
) -> Result<i64> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO authors (author_key, name, title, is_physician, profile_url)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (author_key) DO UPDATE
        SET name = EXCLUDED.name,
            title = EXCLUDED.title,
            is_physician = EXCLUDED.is_physician,
            profile_url = EXCLUDED.profile_url
        RETURNING id
        "#,
    )
    .bind(&post.author_natural_key)
    .bind(&post.author_name)
    .bind(&post.author_title)
    .bind(post.is_physician)
    .bind(&post.author_profile_url)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| LoadError::from_sqlx(e, "author upsert"))
}

/// Upsert the fact row. platform_post_id is the sole idempotency key;
/// reprocessing overwrites all scored attributes (last-write-wins).
async fn upsert_fact(
    tx: &mut Transaction<'_, Postgres>,
    author_id: i64,
    post: &TransformedPost,
) -> Result<i64> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO posts
            (platform_post_id, author_id, posted_at, content,
             sentiment_score, sentiment_label,
             likes, comments, reposts, impact_score, loaded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now())
        ON CONFLICT (platform_post_id) DO UPDATE
        SET author_id = EXCLUDED.author_id,
            posted_at = EXCLUDED.posted_at,
            content = EXCLUDED.content,
            sentiment_score = EXCLUDED.sentiment_score,
            sentiment_label = EXCLUDED.sentiment_label,
            likes = EXCLUDED.likes,
            comments = EXCLUDED.comments,
            reposts = EXCLUDED.reposts,
            impact_score = EXCLUDED.impact_score,
            loaded_at = now()
        RETURNING id
        "#,
    )
    .bind(&post.platform_post_id)
    .bind(author_id)
    .bind(post.posted_at)
    .bind(&post.content)
    .bind(post.sentiment_score)
    .bind(post.sentiment_label.as_str())
    .bind(post.likes)
    .bind(post.comments)
    .bind(post.reposts)
    .bind(post.impact_score)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| LoadError::from_sqlx(e, "fact upsert"))
}

/// Make the stored bridge set equal exactly the post's matched set: stale
/// rows go, missing rows come, unchanged rows are untouched.
async fn reconcile_bridge(
    tx: &mut Transaction<'_, Postgres>,
    post_id: i64,
    category: EntityCategory,
    post: &TransformedPost,
) -> Result<()> {
    let (table, code_col) = bridge_table(category);
    let codes: Vec<String> = post.matched(category).iter().cloned().collect();

    sqlx::query(&format!(
        "DELETE FROM {table} WHERE post_id = $1 AND {code_col} != ALL($2)"
    ))
    .bind(post_id)
    .bind(&codes)
    .execute(&mut **tx)
    .await?;

    for code in &codes {
        sqlx::query(&format!(
            r#"
            INSERT INTO {table} (post_id, {code_col})
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#
        ))
        .bind(post_id)
        .bind(code)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

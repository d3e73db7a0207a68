//! Schema migration and dimension seeding. Applied once at startup, before
//! any record is processed.

use sqlx::PgPool;
use tracing::info;

use payerpulse_common::{EntityCategory, RuleBook};

use crate::error::Result;

/// Run the embedded SQL migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| crate::error::LoadError::Database(e.into()))?;
    Ok(())
}

/// Upsert the static payer/procedure/topic dimensions from the rule book.
/// The extractor only ever emits codes from the rule book, so seeding here
/// guarantees every bridge row has a dimension row to reference.
pub async fn seed_dimensions(pool: &PgPool, rules: &RuleBook) -> Result<()> {
    for category in [
        EntityCategory::Payer,
        EntityCategory::Procedure,
        EntityCategory::Topic,
    ] {
        let table = dimension_table(category);
        let mut seeded = 0u32;
        for rule in rules.entity_rules(category) {
            sqlx::query(&format!(
                r#"
                INSERT INTO {table} (code, display_name)
                VALUES ($1, $2)
                ON CONFLICT (code) DO UPDATE SET display_name = EXCLUDED.display_name
                "#
            ))
            .bind(&rule.code)
            .bind(&rule.display_name)
            .execute(pool)
            .await?;
            seeded += 1;
        }
        info!(category = %category, seeded, "Dimension seeded");
    }
    Ok(())
}

pub(crate) fn dimension_table(category: EntityCategory) -> &'static str {
    match category {
        EntityCategory::Payer => "payers",
        EntityCategory::Procedure => "procedures",
        EntityCategory::Topic => "topics",
    }
}

pub(crate) fn bridge_table(category: EntityCategory) -> (&'static str, &'static str) {
    match category {
        EntityCategory::Payer => ("post_payers", "payer_code"),
        EntityCategory::Procedure => ("post_procedures", "procedure_code"),
        EntityCategory::Topic => ("post_topics", "topic_code"),
    }
}

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use payerpulse_common::{Config, RuleBook};
use payerpulse_pipeline::{Assembler, PipelineRunner, RawStoreReader};
use payerpulse_pipeline::sentiment::LexiconScorer;
use payerpulse_warehouse::{schema, WarehouseLoader};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("payerpulse=info".parse()?))
        .init();

    info!("PayerPulse pipeline starting...");

    // Load config
    let config = Config::from_env();
    config.log_redacted();

    // Rule data is validated before any record is touched; a corrupt
    // dictionary aborts the run here.
    let rules = Arc::new(RuleBook::from_path(&config.rules_path)?);
    info!(version = rules.version, "Rule book loaded");

    // Connect to the warehouse
    let pool = PgPoolOptions::new()
        .max_connections(config.load_concurrency as u32 + 2)
        .connect(&config.database_url)
        .await?;

    // Run migrations and refresh the static dimensions
    schema::migrate(&pool).await?;
    schema::seed_dimensions(&pool, &rules).await?;

    let scorer = Arc::new(LexiconScorer::new(&rules));
    let assembler = Assembler::new(rules, scorer);
    let loader = WarehouseLoader::new(pool);
    let runner = PipelineRunner::new(assembler, loader, config.load_concurrency);

    let reader = RawStoreReader::new(&config.raw_store_dir);
    let report = runner.run(reader.records()?).await?;
    info!("Batch run complete. {report}");

    Ok(())
}

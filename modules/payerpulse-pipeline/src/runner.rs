//! Batch orchestration: transform every raw record (pure, per-record), then
//! load the results with bounded concurrency. Record-level errors are
//! counted and reported, never propagated; only configuration and
//! catastrophic I/O errors abort the run.

use std::collections::HashMap;

use chrono::Utc;
use futures::{stream, StreamExt};
use tracing::warn;
use uuid::Uuid;

use payerpulse_common::{PayerPulseError, RawRecord, TransformedPost};
use payerpulse_warehouse::WarehouseLoader;

use crate::assemble::Assembler;

pub struct PipelineRunner {
    assembler: Assembler,
    loader: WarehouseLoader,
    load_concurrency: usize,
}

/// One skipped raw record: the platform post id when the document carried
/// one, otherwise its file:line position.
#[derive(Debug)]
pub struct SkippedRecord {
    pub identifier: String,
    pub reason: String,
}

/// One post the warehouse refused. The batch keeps going.
#[derive(Debug)]
pub struct FailedLoad {
    pub platform_post_id: String,
    pub error: String,
}

/// Outcome of one batch run.
#[derive(Debug)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub records_read: u32,
    pub transformed: u32,
    pub loaded: u32,
    pub skipped: Vec<SkippedRecord>,
    pub load_failures: Vec<FailedLoad>,
}

impl BatchReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            records_read: 0,
            transformed: 0,
            loaded: 0,
            skipped: Vec::new(),
            load_failures: Vec::new(),
        }
    }
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Batch Run Complete ===")?;
        writeln!(f, "Run id:          {}", self.run_id)?;
        writeln!(f, "Records read:    {}", self.records_read)?;
        writeln!(f, "Transformed:     {}", self.transformed)?;
        writeln!(f, "Loaded:          {}", self.loaded)?;
        writeln!(f, "Skipped:         {}", self.skipped.len())?;
        writeln!(f, "Load failures:   {}", self.load_failures.len())?;
        for s in &self.skipped {
            writeln!(f, "  skipped {}: {}", s.identifier, s.reason)?;
        }
        for l in &self.load_failures {
            writeln!(f, "  failed {}: {}", l.platform_post_id, l.error)?;
        }
        Ok(())
    }
}

impl PipelineRunner {
    pub fn new(assembler: Assembler, loader: WarehouseLoader, load_concurrency: usize) -> Self {
        Self {
            assembler,
            loader,
            load_concurrency: load_concurrency.max(1),
        }
    }

    /// Process one batch to completion. Safe to re-run on the same records
    /// at any time, including after a partial prior failure.
    pub async fn run(
        &self,
        records: impl Iterator<Item = Result<RawRecord, PayerPulseError>>,
    ) -> anyhow::Result<BatchReport> {
        let started_at = Utc::now();
        let mut report = BatchReport::new(Uuid::new_v4());

        // Transform phase: pure, per-record. A replayed document can appear
        // more than once in a batch; the last occurrence wins, matching the
        // warehouse reprocessing policy.
        let mut posts: Vec<TransformedPost> = Vec::new();
        let mut index_by_id: HashMap<String, usize> = HashMap::new();
        for record in records {
            match record {
                Ok(raw) => {
                    report.records_read += 1;
                    match self.assembler.assemble(&raw, started_at) {
                        Ok(post) => {
                            report.transformed += 1;
                            match index_by_id.get(&post.platform_post_id) {
                                Some(&i) => posts[i] = post,
                                None => {
                                    index_by_id.insert(post.platform_post_id.clone(), posts.len());
                                    posts.push(post);
                                }
                            }
                        }
                        Err(e) => {
                            let identifier = record_identifier(&raw);
                            warn!(identifier = identifier.as_str(), error = %e, "Skipping record");
                            report.skipped.push(SkippedRecord {
                                identifier,
                                reason: e.to_string(),
                            });
                        }
                    }
                }
                Err(e) if e.is_record_level() => {
                    report.records_read += 1;
                    // An unreadable line has no post id; its file:line
                    // position is the only handle on it.
                    let identifier = match &e {
                        PayerPulseError::UnreadableRecord { position, .. } => position.clone(),
                        _ => "<unknown>".to_string(),
                    };
                    warn!(identifier = identifier.as_str(), error = %e, "Skipping unreadable record");
                    report.skipped.push(SkippedRecord {
                        identifier,
                        reason: e.to_string(),
                    });
                }
                // Raw store failures are catastrophic, not record-level.
                Err(e) => return Err(e.into()),
            }
        }

        // Load phase: the loader is the only point of shared contention;
        // per-post transactions make concurrent loads safe.
        let results: Vec<(String, payerpulse_warehouse::Result<()>)> =
            stream::iter(posts.into_iter().map(|post| {
                let loader = self.loader.clone();
                async move {
                    let id = post.platform_post_id.clone();
                    let result = loader.load_post(&post).await;
                    (id, result)
                }
            }))
            .buffer_unordered(self.load_concurrency)
            .collect()
            .await;

        for (platform_post_id, result) in results {
            match result {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    warn!(platform_post_id = platform_post_id.as_str(), error = %e, "Load failed");
                    report.load_failures.push(FailedLoad {
                        platform_post_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

fn record_identifier(raw: &RawRecord) -> String {
    raw.doc
        .get("post_id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("{}:{}", raw.source, raw.line))
}

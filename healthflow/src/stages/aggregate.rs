//! Aggregate stage: one canonical record per family per day.

use super::{as_count, Persistence, Stage};
use crate::aggregation::{aggregate_window, AggregatorRegistry};
use crate::context::PipelineContext;
use crate::core::{AggregationFamily, DayRecord, StageName, StageResult};
use crate::errors::StageError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// SHA-256 over the JSON encoding of the aggregated data.
///
/// Equal aggregates give equal fingerprints, which makes repeated runs over
/// unchanged inputs easy to compare.
#[must_use]
pub fn fingerprint(aggregated: &BTreeMap<AggregationFamily, Vec<DayRecord>>) -> String {
    let encoded = serde_json::to_vec(aggregated).unwrap_or_default();
    hex::encode(Sha256::digest(&encoded))
}

/// Stage 4: walk the date range and run every registered aggregator.
pub struct AggregateStage {
    registry: Arc<AggregatorRegistry>,
    persistence: Arc<dyn Persistence>,
}

impl std::fmt::Debug for AggregateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateStage")
            .field("aggregators", &self.registry.names())
            .finish_non_exhaustive()
    }
}

impl AggregateStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(registry: Arc<AggregatorRegistry>, persistence: Arc<dyn Persistence>) -> Self {
        Self {
            registry,
            persistence,
        }
    }
}

#[async_trait]
impl Stage for AggregateStage {
    fn name(&self) -> StageName {
        StageName::Aggregate
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<StageResult, StageError> {
        if ctx.transformed_data.is_empty() {
            info!("No transformed data; skipping aggregation");
            return Ok(StageResult::skipped(
                StageName::Aggregate,
                "no transformed data",
            ));
        }

        let range = ctx.date_range();
        let output = aggregate_window(&self.registry, ctx, range);
        let mut tally = output.tally;
        ctx.aggregated_data = output.records;

        let mut file_paths: BTreeMap<String, PathBuf> = BTreeMap::new();
        if ctx.enable_csv {
            for (family, records) in &ctx.aggregated_data {
                match self
                    .persistence
                    .save_aggregated(*family, records, ctx.started_at)
                {
                    Ok(path) => {
                        file_paths.insert(format!("{family}_aggregated"), path);
                    }
                    Err(e) => tally.warn(format!("failed to save {family}: {e}")),
                }
            }
        }

        let digest = fingerprint(&ctx.aggregated_data);
        let total = ctx.aggregated_count();
        info!(days = range.len(), records = total, fingerprint = %digest, "Aggregation finished");

        let mut result = tally
            .into_result(StageName::Aggregate, "aggregate")
            .with_count("days", as_count(range.len()))
            .with_count("records", as_count(total))
            .with_label("fingerprint", digest)
            .with_file_paths(file_paths);
        for (family, records) in &ctx.aggregated_data {
            result = result.with_count(format!("{family}_records"), as_count(records.len()));
        }
        Ok(result)
    }
}

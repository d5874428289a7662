//! Transform stage: coerces extracted records into canonical records.

use super::{as_count, ItemTally, Persistence, Stage};
use crate::context::{PipelineContext, TransformedRecords};
use crate::core::{CleanRecord, DataType, StageName, StageResult};
use crate::errors::StageError;
use crate::transform::TransformerRegistry;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Stage 3: transform extracted records.
///
/// Work items are `(service, data type key)` pairs. Keys are normalised
/// through [`DataType::from_key`]; unknown keys are skipped with a warning.
/// Two keys of one service that name the same data type are merged.
pub struct TransformStage {
    registry: TransformerRegistry,
    persistence: Arc<dyn Persistence>,
}

impl std::fmt::Debug for TransformStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformStage")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl TransformStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(registry: TransformerRegistry, persistence: Arc<dyn Persistence>) -> Self {
        Self {
            registry,
            persistence,
        }
    }
}

#[async_trait]
impl Stage for TransformStage {
    fn name(&self) -> StageName {
        StageName::Transform
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<StageResult, StageError> {
        let mut tally = ItemTally::new();
        let mut file_paths: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut records = 0;
        let mut filtered = 0;
        let mut outputs: Vec<(String, TransformedRecords)> = Vec::new();

        for (service, extracted) in &ctx.extracted_data {
            let mut by_type = TransformedRecords::new();
            let mut service_succeeded = false;

            for (key, items) in extracted {
                let item = format!("{service}:{key}");
                let Some(data_type) = DataType::from_key(key) else {
                    tally.warn(format!("{item}: unrecognised data type, skipped"));
                    continue;
                };
                let Some(transformer) = self.registry.get(data_type) else {
                    tally.warn(format!("{item}: no transformer for {data_type}, skipped"));
                    continue;
                };

                match transformer.transform(items) {
                    Ok(output) => {
                        debug!(
                            item = %item,
                            kept = output.records.len(),
                            filtered = output.filtered.len(),
                            "Transformed"
                        );
                        filtered += output.filtered.len();
                        for reason in output.filtered {
                            tally.warn(format!("{service}: {reason}"));
                        }
                        by_type.entry(data_type).or_default().extend(output.records);
                        service_succeeded = true;
                        tally.succeed(item);
                    }
                    Err(e) => tally.fail(item, e),
                }
            }

            if service_succeeded {
                for list in by_type.values_mut() {
                    list.sort_by_key(CleanRecord::date);
                }
                outputs.push((service.clone(), by_type));
            }
        }

        for (service, by_type) in outputs {
            if ctx.enable_csv {
                for (data_type, list) in &by_type {
                    match self
                        .persistence
                        .save_transformed(&service, *data_type, list, ctx.started_at)
                    {
                        Ok(path) => {
                            file_paths.insert(format!("{service}_{data_type}_transformed"), path);
                        }
                        Err(e) => tally.warn(format!(
                            "{service}: failed to save transformed {data_type}: {e}"
                        )),
                    }
                }
            }
            records += by_type.values().map(Vec::len).sum::<usize>();
            ctx.transformed_data
                .insert(service, by_type)
                .map_err(|e| e.into_stage(StageName::Transform.as_str()))?;
        }

        info!(records, filtered, "Transform finished");
        Ok(tally
            .into_result(StageName::Transform, "transform")
            .with_count("records", as_count(records))
            .with_count("filtered", as_count(filtered))
            .with_file_paths(file_paths))
    }
}

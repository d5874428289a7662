//! Extract stage: splits each service's raw payloads into record lists.

use super::{as_count, Extractor, ItemTally, Persistence, Stage};
use crate::context::PipelineContext;
use crate::core::{StageName, StageResult};
use crate::errors::{ExtractionError, StageError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Stage 2: extract records from raw payloads.
///
/// Work items are services with raw data. A service without a registered
/// extractor fails its item.
pub struct ExtractStage {
    extractors: BTreeMap<String, Arc<dyn Extractor>>,
    persistence: Arc<dyn Persistence>,
}

impl std::fmt::Debug for ExtractStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractStage")
            .field("extractors", &self.extractors.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ExtractStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(
        extractors: BTreeMap<String, Arc<dyn Extractor>>,
        persistence: Arc<dyn Persistence>,
    ) -> Self {
        Self {
            extractors,
            persistence,
        }
    }
}

#[async_trait]
impl Stage for ExtractStage {
    fn name(&self) -> StageName {
        StageName::Extract
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<StageResult, StageError> {
        let mut tally = ItemTally::new();
        let mut file_paths: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut records = 0;

        for service in ctx.services.clone() {
            let Some(raw) = ctx.raw_data.get(&service) else {
                debug!(service = %service, "No raw data; nothing to extract");
                continue;
            };

            let extracted = match self.extractors.get(&service) {
                Some(extractor) => extractor.extract(raw),
                None => Err(ExtractionError::MissingExtractor(service.clone())),
            };
            let extracted = match extracted {
                Ok(extracted) => extracted,
                Err(e) => {
                    tally.fail(&service, e);
                    continue;
                }
            };

            if ctx.enable_csv {
                for (data_type, items) in &extracted {
                    match self
                        .persistence
                        .save_extracted(&service, data_type, items, ctx.started_at)
                    {
                        Ok(path) => {
                            file_paths.insert(format!("{service}_{data_type}_extracted"), path);
                        }
                        Err(e) => tally.warn(format!(
                            "{service}: failed to save extracted {data_type}: {e}"
                        )),
                    }
                }
            }

            let count: usize = extracted.values().map(Vec::len).sum();
            debug!(service = %service, types = extracted.len(), records = count, "Extracted");
            records += count;
            ctx.extracted_data
                .insert(service.clone(), extracted)
                .map_err(|e| e.into_stage(StageName::Extract.as_str()))?;
            tally.succeed(service);
        }

        info!(services = tally.succeeded().len(), records, "Extract finished");
        Ok(tally
            .into_result(StageName::Extract, "extract")
            .with_count("records", as_count(records))
            .with_file_paths(file_paths))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{DateRange, RawPayloads};
    use crate::core::StageStatus;
    use crate::providers::PassthroughExtractor;
    use crate::stages::MockPersistence;
    use crate::testing::fixtures::day;
    use serde_json::json;

    fn context_with_raw(raw: Vec<(&str, RawPayloads)>) -> PipelineContext {
        let services: Vec<&str> = raw.iter().map(|(s, _)| *s).collect();
        let mut ctx = PipelineContext::new(DateRange::single(day(1)), services);
        for (service, payloads) in raw {
            ctx.raw_data.insert(service, payloads).unwrap();
        }
        ctx
    }

    fn payloads(kind: &str, items: Vec<serde_json::Value>) -> RawPayloads {
        RawPayloads::from([(kind.to_string(), items)])
    }

    fn extractors(services: &[&str]) -> BTreeMap<String, Arc<dyn Extractor>> {
        services
            .iter()
            .map(|s| ((*s).to_string(), Arc::new(PassthroughExtractor::new()) as Arc<dyn Extractor>))
            .collect()
    }

    #[tokio::test]
    async fn test_extracts_every_service() {
        let mut ctx = context_with_raw(vec![
            ("whoop", payloads("workouts", vec![json!({"date": "2025-07-01"})])),
            ("nutrition", payloads("nutrition", vec![json!({"date": "2025-07-01"})])),
        ])
        .with_csv(false);
        let stage = ExtractStage::new(
            extractors(&["whoop", "nutrition"]),
            Arc::new(MockPersistence::new()),
        );

        let result = stage.execute(&mut ctx).await.unwrap();

        assert_eq!(result.status, StageStatus::Success);
        assert_eq!(result.metrics.count("records"), 2);
        assert!(ctx.extracted_data.contains_key("whoop"));
        assert!(ctx.extracted_data.contains_key("nutrition"));
    }

    #[tokio::test]
    async fn test_bad_shape_and_missing_extractor_are_isolated() {
        let mut ctx = context_with_raw(vec![
            ("whoop", payloads("workouts", vec![json!("not an object")])),
            ("oura", payloads("activity", vec![json!({"date": "2025-07-01"})])),
            ("hevy", payloads("workouts", vec![json!({"date": "2025-07-01"})])),
        ])
        .with_csv(false);
        let stage = ExtractStage::new(extractors(&["whoop", "oura"]), Arc::new(MockPersistence::new()));

        let result = stage.execute(&mut ctx).await.unwrap();

        assert_eq!(result.status, StageStatus::Partial);
        assert_eq!(result.error.as_deref(), Some("Failed to extract: whoop, hevy"));
        assert_eq!(ctx.extracted_data.keys(), vec!["oura"]);
    }

    #[tokio::test]
    async fn test_no_raw_data_is_skipped() {
        let mut ctx = PipelineContext::new(DateRange::single(day(1)), ["whoop"]);
        let stage = ExtractStage::new(extractors(&["whoop"]), Arc::new(MockPersistence::new()));

        let result = stage.execute(&mut ctx).await.unwrap();

        assert_eq!(result.status, StageStatus::Skipped);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_a_warning() {
        let mut persistence = MockPersistence::new();
        persistence.expect_save_extracted().returning(|_, _, _, _| {
            Err(crate::errors::PersistenceError::Encoding {
                artifact: "whoop_workouts_extracted".to_string(),
                message: "disk full".to_string(),
            })
        });
        let mut ctx = context_with_raw(vec![(
            "whoop",
            payloads("workouts", vec![json!({"date": "2025-07-01"})]),
        )]);
        let stage = ExtractStage::new(extractors(&["whoop"]), Arc::new(persistence));

        let result = stage.execute(&mut ctx).await.unwrap();

        assert_eq!(result.status, StageStatus::Success);
        assert_eq!(result.metrics.warnings.len(), 1);
        assert!(result.file_paths.is_empty());
    }
}

//! Fetch stage: pulls raw payloads from every requested service.
//!
//! Work items are `(service, kind, window)` triples. Services are fetched
//! with an ordered, bounded fan-out; each service keeps its own tally and
//! payload map, merged into the context after the join.

use super::{as_count, HealthService, ItemTally, Persistence, Stage};
use crate::config::FetchConfig;
use crate::context::{DateRange, PipelineContext, RawPayloads};
use crate::core::{StageName, StageResult};
use crate::errors::{FetchError, StageError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// What one service produced.
#[derive(Debug, Default)]
struct ServiceFetch {
    service: String,
    payloads: RawPayloads,
    tally: ItemTally,
}

impl ServiceFetch {
    fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    fn record_count(&self) -> usize {
        self.payloads.values().map(Vec::len).sum()
    }
}

/// Stage 1: fetch raw data.
pub struct FetchStage {
    services: BTreeMap<String, Arc<dyn HealthService>>,
    persistence: Arc<dyn Persistence>,
    config: FetchConfig,
}

impl std::fmt::Debug for FetchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchStage")
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FetchStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(
        services: BTreeMap<String, Arc<dyn HealthService>>,
        persistence: Arc<dyn Persistence>,
        config: FetchConfig,
    ) -> Self {
        Self {
            services,
            persistence,
            config,
        }
    }
}

async fn fetch_service(
    id: String,
    service: Option<Arc<dyn HealthService>>,
    windows: Vec<DateRange>,
) -> ServiceFetch {
    let mut fetched = ServiceFetch::new(&id);

    let Some(service) = service else {
        fetched.tally.fail(&id, FetchError::UnknownService(id.clone()));
        return fetched;
    };

    let kinds = service.data_kinds();
    if kinds.is_empty() {
        fetched.tally.warn(format!("{id}: service offers no data kinds"));
        return fetched;
    }

    if !service.is_authenticated().await {
        for kind in &kinds {
            for window in &windows {
                fetched.tally.fail(
                    format!("{id}:{kind}@{window}"),
                    FetchError::NotAuthenticated {
                        service: id.clone(),
                    },
                );
            }
        }
        return fetched;
    }

    for kind in &kinds {
        for window in &windows {
            let item = format!("{id}:{kind}@{window}");
            match service.fetch(kind, *window).await {
                Ok(payload) => {
                    let items = match payload {
                        Value::Array(items) => items,
                        Value::Null => Vec::new(),
                        other => vec![other],
                    };
                    debug!(item = %item, count = items.len(), "Fetched");
                    fetched.payloads.entry(kind.clone()).or_default().extend(items);
                    fetched.tally.succeed(item);
                }
                Err(e) if e.is_unsupported() => {
                    fetched.tally.warn(format!("{item}: {e}"));
                    break;
                }
                Err(e) => fetched.tally.fail(item, e),
            }
        }
    }

    fetched
}

#[async_trait]
impl Stage for FetchStage {
    fn name(&self) -> StageName {
        StageName::Fetch
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<StageResult, StageError> {
        let windows = ctx.date_range().windows(self.config.chunk_days);
        info!(
            services = ctx.services.len(),
            windows = windows.len(),
            concurrency = self.config.max_concurrent_services,
            "Fetching raw data"
        );

        let jobs = ctx.services.clone().into_iter().map(|id| {
            let service = self.services.get(&id).cloned();
            fetch_service(id, service, windows.clone())
        });
        let fetched: Vec<ServiceFetch> = stream::iter(jobs)
            .buffered(self.config.max_concurrent_services.max(1))
            .collect()
            .await;

        let mut tally = ItemTally::new();
        let mut file_paths: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut records = 0;
        let mut services_fetched = 0;

        for service_fetch in fetched {
            let fetched_records = service_fetch.record_count();
            let ServiceFetch {
                service,
                payloads,
                tally: service_tally,
            } = service_fetch;
            let any_succeeded = !service_tally.succeeded().is_empty();
            tally.absorb(service_tally);
            if !any_succeeded {
                continue;
            }

            if ctx.enable_csv {
                match self.persistence.save_raw(&service, &payloads, ctx.started_at) {
                    Ok(path) => {
                        file_paths.insert(format!("{service}_raw"), path);
                    }
                    Err(e) => tally.warn(format!("{service}: failed to save raw data: {e}")),
                }
            }

            records += fetched_records;
            services_fetched += 1;
            ctx.raw_data
                .insert(service, payloads)
                .map_err(|e| e.into_stage(StageName::Fetch.as_str()))?;
        }

        info!(services_fetched, records, "Fetch finished");
        Ok(tally
            .into_result(StageName::Fetch, "fetch")
            .with_count("services_fetched", as_count(services_fetched))
            .with_count("records", as_count(records))
            .with_file_paths(file_paths))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageStatus;
    use crate::stages::MockPersistence;
    use crate::testing::mocks::StubService;
    use crate::testing::fixtures::day;
    use serde_json::json;

    fn context(days: u32, services: &[&str]) -> PipelineContext {
        PipelineContext::new(DateRange::ending_at(day(days), days), services.iter().copied())
    }

    fn services(list: Vec<StubService>) -> BTreeMap<String, Arc<dyn HealthService>> {
        list.into_iter()
            .map(|s| (s.id().to_string(), Arc::new(s) as Arc<dyn HealthService>))
            .collect()
    }

    #[tokio::test]
    async fn test_failed_day_is_isolated() {
        let whoop = StubService::new("whoop")
            .with_records("workouts", vec![json!({"date": "2025-07-01"}), json!({"date": "2025-07-03"})])
            .failing_on(day(2));
        let stage = FetchStage::new(
            services(vec![whoop]),
            Arc::new(MockPersistence::new()),
            FetchConfig::default(),
        );
        let mut ctx = context(3, &["whoop"]).with_csv(false);

        let result = stage.execute(&mut ctx).await.unwrap();

        assert_eq!(result.status, StageStatus::Partial);
        assert_eq!(result.metrics.count("failed"), 1);
        assert_eq!(result.metrics.count("succeeded"), 2);
        assert!(result.error.unwrap().contains("whoop:workouts@2025-07-02"));
        assert_eq!(ctx.raw_data.get("whoop").unwrap()["workouts"].len(), 2);
    }

    #[tokio::test]
    async fn test_unauthenticated_service_fails_every_item() {
        let whoop = StubService::new("whoop")
            .with_records("workouts", vec![])
            .unauthenticated();
        let stage = FetchStage::new(
            services(vec![whoop]),
            Arc::new(MockPersistence::new()),
            FetchConfig::default(),
        );
        let mut ctx = context(2, &["whoop"]).with_csv(false);

        let result = stage.execute(&mut ctx).await.unwrap();

        assert_eq!(result.status, StageStatus::Failed);
        assert_eq!(result.metrics.count("failed"), 2);
        assert!(ctx.raw_data.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_service_and_unsupported_kind() {
        let oura = StubService::new("oura")
            .with_records("activity", vec![json!({"date": "2025-07-01"})])
            .with_unsupported("resilience");
        let stage = FetchStage::new(
            services(vec![oura]),
            Arc::new(MockPersistence::new()),
            FetchConfig::default(),
        );
        let mut ctx = context(1, &["oura", "garmin"]).with_csv(false);

        let result = stage.execute(&mut ctx).await.unwrap();

        assert_eq!(result.status, StageStatus::Partial);
        assert_eq!(result.error.as_deref(), Some("Failed to fetch: garmin"));
        assert_eq!(result.metrics.warnings.len(), 1);
        assert!(result.metrics.warnings[0].contains("oura:resilience"));
    }

    #[tokio::test]
    async fn test_raw_payloads_are_persisted() {
        let mut persistence = MockPersistence::new();
        persistence
            .expect_save_raw()
            .withf(|service, payload, _| service == "nutrition" && payload.contains_key("nutrition"))
            .times(1)
            .returning(|_, _, _| Ok(PathBuf::from("data/01_raw/nutrition_raw.json")));

        let nutrition = StubService::new("nutrition")
            .with_records("nutrition", vec![json!({"date": "2025-07-01", "calories": 1800})]);
        let stage = FetchStage::new(
            services(vec![nutrition]),
            Arc::new(persistence),
            FetchConfig::default(),
        );
        let mut ctx = context(1, &["nutrition"]);

        let result = stage.execute(&mut ctx).await.unwrap();

        assert_eq!(result.status, StageStatus::Success);
        assert_eq!(
            result.file_paths.get("nutrition_raw"),
            Some(&PathBuf::from("data/01_raw/nutrition_raw.json"))
        );
    }

    #[tokio::test]
    async fn test_concurrent_fetch_keeps_service_order() {
        let a = StubService::new("a").with_records("workouts", vec![json!({"date": "2025-07-01"})]);
        let b = StubService::new("b").with_records("workouts", vec![json!({"date": "2025-07-01"})]);
        let stage = FetchStage::new(
            services(vec![a, b]),
            Arc::new(MockPersistence::new()),
            FetchConfig::default().with_max_concurrent_services(4),
        );
        let mut ctx = context(1, &["b", "a"]).with_csv(false);

        let result = stage.execute(&mut ctx).await.unwrap();

        assert_eq!(result.status, StageStatus::Success);
        assert_eq!(ctx.raw_data.keys(), vec!["a", "b"]);
        assert_eq!(result.metrics.count("services_fetched"), 2);
    }
}

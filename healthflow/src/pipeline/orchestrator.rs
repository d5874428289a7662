//! The orchestrator: runs the fixed stage sequence over one context.

use super::PipelineOutcome;
use crate::config::{PipelineConfig, MAX_DAYS};
use crate::context::{DateRange, PipelineContext};
use crate::core::{StageName, StageResult};
use crate::events::{EventSink, PipelineEvent};
use crate::stages::Stage;
use chrono::{Local, NaiveDate};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};

/// Runs the stages in order and records one result per stage.
///
/// A stage that returns `Err` or panics is recorded as FAILED and the next
/// stage still runs.
pub struct Orchestrator {
    stages: Vec<Arc<dyn Stage>>,
    event_sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub(crate) fn new(stages: Vec<Arc<dyn Stage>>, event_sink: Arc<dyn EventSink>) -> Self {
        Self { stages, event_sink }
    }

    /// The stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs the pipeline for the `days` days ending today.
    pub async fn run<I, S>(
        &self,
        days: u32,
        services: I,
        enable_csv: bool,
        debug_mode: bool,
    ) -> PipelineOutcome
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let today = Local::now().date_naive();
        self.run_until(today, days, services, enable_csv, debug_mode)
            .await
    }

    /// Runs the pipeline for the `days` days ending on `end_date`.
    ///
    /// `days` is clamped to `1..=MAX_DAYS`.
    pub async fn run_until<I, S>(
        &self,
        end_date: NaiveDate,
        days: u32,
        services: I,
        enable_csv: bool,
        debug_mode: bool,
    ) -> PipelineOutcome
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let days = match days {
            0 => {
                warn!("Requested 0 days; running for 1 day instead");
                1
            }
            d if d > MAX_DAYS => {
                warn!(requested = d, max = MAX_DAYS, "Requested range too long; clamping");
                MAX_DAYS
            }
            d => d,
        };
        let ctx = PipelineContext::new(DateRange::ending_at(end_date, days), services)
            .with_csv(enable_csv)
            .with_debug(debug_mode);
        self.execute(ctx).await
    }

    /// Runs the pipeline with a configuration's range, services and flags.
    pub async fn run_config(&self, config: &PipelineConfig) -> PipelineOutcome {
        self.run(
            config.days,
            config.services.iter().cloned(),
            config.enable_csv,
            config.debug_mode,
        )
        .await
    }

    /// Runs every stage over a prepared context.
    pub async fn execute(&self, mut ctx: PipelineContext) -> PipelineOutcome {
        let started = Instant::now();
        let run_id = ctx.run_id;

        info!(
            %run_id,
            range = %ctx.date_range(),
            services = ?ctx.services,
            enable_csv = ctx.enable_csv,
            "Starting pipeline run"
        );
        self.event_sink
            .emit(&PipelineEvent::RunStarted {
                run_id,
                start_date: ctx.start_date,
                end_date: ctx.end_date,
                services: ctx.services.clone(),
            })
            .await;

        for stage in &self.stages {
            let name = stage.name();
            self.event_sink
                .emit(&PipelineEvent::StageStarted { run_id, stage: name })
                .await;

            let stage_started = Instant::now();
            let span = info_span!("stage", name = %name, run_id = %run_id);
            let outcome = AssertUnwindSafe(stage.execute(&mut ctx).instrument(span))
                .catch_unwind()
                .await;
            let duration = stage_started.elapsed().as_secs_f64();

            let result = match outcome {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    error!("{} stage failed: {}", name, e);
                    StageResult::failed(name, format!("Unexpected error in {name} stage: {e}"))
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!("{} stage panicked: {}", name, message);
                    StageResult::failed(
                        name,
                        format!("Unexpected error in {name} stage: {message}"),
                    )
                }
            }
            .with_duration(duration);

            info!(
                stage = %name,
                status = %result.status,
                duration_seconds = duration,
                "{} {} stage",
                result.status.symbol(),
                name
            );
            self.event_sink
                .emit(&PipelineEvent::StageFinished {
                    run_id,
                    stage: name,
                    status: result.status,
                    duration_seconds: duration,
                })
                .await;
            ctx.add_stage_result(result);
        }

        let outcome = PipelineOutcome::new(ctx, started.elapsed().as_secs_f64());
        self.event_sink
            .emit(&PipelineEvent::RunFinished {
                run_id,
                success: outcome.success(),
                duration_seconds: outcome.duration_seconds(),
            })
            .await;
        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "stage panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageStatus;
    use crate::events::CollectingEventSink;
    use crate::pipeline::PipelineBuilder;
    use crate::report::MarkdownReportRenderer;
    use crate::stages::Collaborators;
    use crate::config::FetchConfig;
    use crate::providers::PassthroughExtractor;
    use crate::testing::fixtures::{day, raw_workout};
    use crate::testing::{
        assert_outcome_stage, assert_stage_order, FailingStage, PanickingStage,
        RecordingPersistence, RecordingStage, StubService,
    };
    use pretty_assertions::assert_eq;

    fn builder() -> PipelineBuilder {
        PipelineBuilder::new(Collaborators::new(
            Arc::new(RecordingPersistence::new()),
            Arc::new(MarkdownReportRenderer::new()),
        ))
    }

    #[tokio::test]
    async fn test_range_has_exactly_days_dates() {
        let orchestrator = builder().build();
        for days in [1, 3, 8, 30] {
            let outcome = orchestrator.run_until(day(10), days, ["whoop"], false, false).await;
            let range = outcome.date_range();
            assert_eq!(range.end(), day(10));
            assert_eq!(range.len(), days as usize);
        }
    }

    #[tokio::test]
    async fn test_zero_days_clamped() {
        let outcome = builder()
            .build()
            .run_until(day(10), 0, ["whoop"], false, false)
            .await;
        assert_eq!(outcome.date_range(), DateRange::single(day(10)));
    }

    #[tokio::test]
    async fn test_oversized_days_clamped() {
        let outcome = builder()
            .build()
            .run_until(day(3), u32::MAX, ["whoop"], false, false)
            .await;
        let range = outcome.date_range();
        assert_eq!(range.end(), day(3));
        assert_eq!(range.len(), MAX_DAYS as usize);
        assert_stage_order(&outcome, &StageName::ALL);
    }

    #[tokio::test]
    async fn test_oversized_fetch_chunk_fetches_one_window() {
        let whoop = Arc::new(StubService::new("whoop").with_records(
            "workouts",
            vec![raw_workout(day(2), "Cycling", 60.0, 10.0)],
        ));
        let orchestrator = PipelineBuilder::new(
            Collaborators::new(
                Arc::new(RecordingPersistence::new()),
                Arc::new(MarkdownReportRenderer::new()),
            )
            .with_source(whoop.clone(), Arc::new(PassthroughExtractor::new())),
        )
        .with_fetch(FetchConfig::default().with_chunk_days(u32::MAX))
        .build();

        let outcome = orchestrator.run_until(day(3), 3, ["whoop"], false, false).await;

        assert_outcome_stage(&outcome, StageName::Fetch, StageStatus::Success);
        assert_eq!(whoop.calls(), vec!["workouts@2025-07-01..2025-07-03".to_string()]);
    }

    #[tokio::test]
    async fn test_stage_error_recorded_and_run_continues() {
        let report = Arc::new(RecordingStage::new(StageResult::success(StageName::Report)));
        let orchestrator = builder()
            .with_stage(Arc::new(FailingStage::new(StageName::Extract, "conflict")))
            .with_stage(report.clone())
            .build();

        let outcome = orchestrator.run_until(day(3), 3, ["whoop"], false, false).await;

        assert_stage_order(&outcome, &StageName::ALL);
        assert_outcome_stage(&outcome, StageName::Extract, StageStatus::Failed);
        let error = outcome.stage_result(StageName::Extract).unwrap().error.clone();
        assert_eq!(
            error.as_deref(),
            Some("Unexpected error in extract stage: Stage extract failed: conflict")
        );
        assert_eq!(report.call_count(), 1);
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn test_panic_recorded_as_failure() {
        let orchestrator = builder()
            .with_stage(Arc::new(PanickingStage::new(StageName::Aggregate)))
            .build();

        let outcome = orchestrator.run_until(day(3), 3, ["whoop"], false, false).await;

        assert_stage_order(&outcome, &StageName::ALL);
        let aggregate = outcome.stage_result(StageName::Aggregate).unwrap();
        assert_eq!(aggregate.status, StageStatus::Failed);
        assert!(aggregate
            .error
            .as_deref()
            .unwrap()
            .contains("aggregate stage blew up"));
    }

    #[tokio::test]
    async fn test_durations_recorded() {
        let outcome = builder()
            .build()
            .run_until(day(3), 2, ["whoop"], false, false)
            .await;
        assert!(outcome
            .stage_results()
            .iter()
            .all(|r| r.duration_seconds >= 0.0));
        assert!(outcome.duration_seconds() >= 0.0);
    }

    #[tokio::test]
    async fn test_events_bracket_every_stage() {
        let sink = Arc::new(CollectingEventSink::new());
        let orchestrator = builder()
            .with_report(false)
            .with_event_sink(sink.clone())
            .build();

        orchestrator.run_until(day(3), 1, ["whoop"], false, false).await;

        let types = sink.event_types();
        assert_eq!(types.first(), Some(&"pipeline.started"));
        assert_eq!(types.last(), Some(&"pipeline.completed"));
        assert_eq!(types.iter().filter(|t| **t == "stage.started").count(), 4);
        assert_eq!(types.iter().filter(|t| **t == "stage.completed").count(), 4);
    }
}

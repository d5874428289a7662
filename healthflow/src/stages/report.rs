//! Report stage: adapts the aggregates and renders the weekly report.

use super::{as_count, Persistence, ReportRenderer, Stage};
use crate::context::PipelineContext;
use crate::core::{StageName, StageResult, StageStatus};
use crate::errors::StageError;
use crate::legacy::LegacyReportAdapter;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Stage 5: render the report.
///
/// The report is always persisted, independent of `enable_csv`; a failed
/// write is a warning.
pub struct ReportStage {
    renderer: Arc<dyn ReportRenderer>,
    persistence: Arc<dyn Persistence>,
}

impl std::fmt::Debug for ReportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportStage")
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

impl ReportStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(renderer: Arc<dyn ReportRenderer>, persistence: Arc<dyn Persistence>) -> Self {
        Self {
            renderer,
            persistence,
        }
    }
}

#[async_trait]
impl Stage for ReportStage {
    fn name(&self) -> StageName {
        StageName::Report
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<StageResult, StageError> {
        if ctx.aggregated_count() == 0 {
            warn!("No aggregated data available for report generation");
            return Ok(StageResult::skipped(
                StageName::Report,
                "no aggregated data",
            ));
        }

        let tables = LegacyReportAdapter::adapt(&ctx.aggregated_data, ctx.end_date);
        info!(window = %tables.window, rows = tables.row_count(), "Generating report");

        let content = match self.renderer.render(&tables) {
            Ok(content) if content.trim().is_empty() => {
                return Ok(StageResult::failed(
                    StageName::Report,
                    "Report generation returned empty content",
                ));
            }
            Ok(content) => content,
            Err(e) => {
                return Ok(StageResult::failed(StageName::Report, e.to_string()));
            }
        };

        let mut result = StageResult::new(StageName::Report, StageStatus::Success)
            .with_data("date_range", tables.window.to_string())
            .with_data("report_length", content.len())
            .with_count("report_length", as_count(content.len()))
            .with_count("macros_rows", as_count(tables.macros.len()))
            .with_count("recovery_rows", as_count(tables.recovery.len()))
            .with_count("training_rows", as_count(tables.training.len()));

        match self
            .persistence
            .save_report(ctx.end_date, &content, ctx.started_at)
        {
            Ok(path) => {
                info!(path = %path.display(), "Report saved");
                result = result.with_file_path("report", path);
            }
            Err(e) => {
                let message = format!("failed to save report: {e}");
                warn!("{}", message);
                result = result.with_warnings([message]);
            }
        }

        Ok(result.with_data("report_content", content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DateRange;
    use crate::core::{AggregationFamily, DayRecord, SportType, TrainingDay};
    use crate::errors::RenderError;
    use crate::legacy::LegacyTables;
    use crate::report::MarkdownReportRenderer;
    use crate::stages::MockPersistence;
    use crate::testing::fixtures::day;
    use std::path::PathBuf;

    #[derive(Debug)]
    struct BrokenRenderer;

    impl ReportRenderer for BrokenRenderer {
        fn render(&self, _tables: &LegacyTables) -> Result<String, RenderError> {
            Err(RenderError("template missing".to_string()))
        }
    }

    fn context_with_training() -> PipelineContext {
        let mut ctx = PipelineContext::new(DateRange::ending_at(day(10), 8), ["whoop"]);
        ctx.aggregated_data.insert(
            AggregationFamily::TrainingMetrics,
            vec![DayRecord::Training(TrainingDay {
                date: day(4),
                sport: SportType::StrengthTraining,
                title: Some("Push Day".to_string()),
                duration_minutes: 65.0,
                workout_count: 1,
                strain: Some(10.4),
                calories_burned: None,
            })],
        );
        ctx
    }

    #[tokio::test]
    async fn test_skipped_without_aggregates() {
        let mut ctx = PipelineContext::new(DateRange::single(day(1)), ["whoop"]);
        let stage = ReportStage::new(
            Arc::new(MarkdownReportRenderer::new()),
            Arc::new(MockPersistence::new()),
        );

        let result = stage.execute(&mut ctx).await.unwrap();
        assert_eq!(result.status, StageStatus::Skipped);
    }

    #[tokio::test]
    async fn test_report_rendered_and_saved() {
        let mut persistence = MockPersistence::new();
        persistence
            .expect_save_report()
            .withf(|end, content, _| *end == day(10) && content.contains("Push Day"))
            .times(1)
            .returning(|_, _, _| Ok(PathBuf::from("data/05_reports/health_report_2025-07-10.md")));
        let stage = ReportStage::new(Arc::new(MarkdownReportRenderer::new()), Arc::new(persistence));
        let mut ctx = context_with_training();

        let result = stage.execute(&mut ctx).await.unwrap();

        assert_eq!(result.status, StageStatus::Success);
        assert_eq!(result.metrics.count("training_rows"), 1);
        assert_eq!(result.data["date_range"], "2025-07-03..2025-07-09");
        assert!(result.file_paths.contains_key("report"));
    }

    #[tokio::test]
    async fn test_render_error_fails_stage() {
        let stage = ReportStage::new(Arc::new(BrokenRenderer), Arc::new(MockPersistence::new()));
        let mut ctx = context_with_training();

        let result = stage.execute(&mut ctx).await.unwrap();

        assert_eq!(result.status, StageStatus::Failed);
        assert_eq!(
            result.error.as_deref(),
            Some("report rendering failed: template missing")
        );
    }
}

//! The outcome of one pipeline run.

use crate::context::{DateRange, PipelineContext, ServiceCoverage};
use crate::core::{AggregationFamily, DayRecord, StageName, StageResult, StageStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Everything a run produced, including the final context.
///
/// A run never returns an error: a fully failed run is still an outcome
/// whose stage results say what went wrong.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    context: PipelineContext,
    duration_seconds: f64,
}

impl PipelineOutcome {
    pub(crate) fn new(context: PipelineContext, duration_seconds: f64) -> Self {
        Self {
            context,
            duration_seconds,
        }
    }

    /// True iff every recorded stage is SUCCESS or PARTIAL.
    #[must_use]
    pub fn success(&self) -> bool {
        let results = self.context.stage_results();
        !results.is_empty() && results.iter().all(StageResult::is_completed)
    }

    /// Number of stages that completed.
    #[must_use]
    pub fn stages_completed(&self) -> usize {
        self.context
            .stage_results()
            .iter()
            .filter(|r| r.is_completed())
            .count()
    }

    /// Number of stages that ran.
    #[must_use]
    pub fn total_stages(&self) -> usize {
        self.context.stage_results().len()
    }

    /// Stage results in execution order.
    #[must_use]
    pub fn stage_results(&self) -> &[StageResult] {
        self.context.stage_results()
    }

    /// The result of one stage, if it ran.
    #[must_use]
    pub fn stage_result(&self, stage: StageName) -> Option<&StageResult> {
        self.context.stage_result(stage)
    }

    /// Status of one stage, if it ran.
    #[must_use]
    pub fn stage_status(&self, stage: StageName) -> Option<StageStatus> {
        self.stage_result(stage).map(|r| r.status)
    }

    /// Per service, which stage outputs exist.
    #[must_use]
    pub fn services_processed(&self) -> BTreeMap<String, ServiceCoverage> {
        self.context.services_processed()
    }

    /// Every artifact written during the run.
    #[must_use]
    pub fn file_paths(&self) -> &BTreeMap<String, PathBuf> {
        self.context.file_paths()
    }

    /// Daily records per family.
    #[must_use]
    pub fn aggregated_data(&self) -> &BTreeMap<AggregationFamily, Vec<DayRecord>> {
        &self.context.aggregated_data
    }

    /// The date range the run covered.
    #[must_use]
    pub fn date_range(&self) -> DateRange {
        self.context.date_range()
    }

    /// The run identifier.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.context.run_id
    }

    /// Wall-clock duration of the whole run.
    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    /// The final context.
    #[must_use]
    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Consumes the outcome and returns the final context.
    #[must_use]
    pub fn into_context(self) -> PipelineContext {
        self.context
    }

    /// A serializable summary of the run.
    #[must_use]
    pub fn summary(&self) -> RunSummary<'_> {
        RunSummary {
            run_id: self.run_id(),
            success: self.success(),
            date_range: self.date_range(),
            duration_seconds: self.duration_seconds,
            stages_completed: self.stages_completed(),
            total_stages: self.total_stages(),
            stages: self.stage_results(),
            services_processed: self.services_processed(),
            file_paths: self.file_paths(),
        }
    }
}

/// Serializable view of a [`PipelineOutcome`].
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    /// Run identifier.
    pub run_id: Uuid,
    /// Overall success.
    pub success: bool,
    /// Covered range.
    pub date_range: DateRange,
    /// Wall-clock duration.
    pub duration_seconds: f64,
    /// Completed stage count.
    pub stages_completed: usize,
    /// Executed stage count.
    pub total_stages: usize,
    /// Stage results in execution order.
    pub stages: &'a [StageResult],
    /// Per-service coverage.
    pub services_processed: BTreeMap<String, ServiceCoverage>,
    /// Artifacts.
    pub file_paths: &'a BTreeMap<String, PathBuf>,
}

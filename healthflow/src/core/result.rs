//! Stage result type with factory methods.

use super::{StageName, StageStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Counters and warnings reported by a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageMetrics {
    /// Named counters (items attempted, records written, ...).
    pub counts: BTreeMap<String, u64>,
    /// Errors that were recovered from and must stay visible.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Free-form string metrics such as the aggregated fingerprint.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl StageMetrics {
    /// Returns a counter value, zero if absent.
    #[must_use]
    pub fn count(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }
}

/// The outcome of one stage execution.
///
/// A result is created once per execution and is not mutated after the
/// orchestrator appends it to the context. Builder methods consume `self`.
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    /// Stage that produced this result.
    pub stage_name: StageName,

    /// Outcome status.
    pub status: StageStatus,

    /// Free-form summary data.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, serde_json::Value>,

    /// Artifacts written by the stage, keyed by label.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub file_paths: BTreeMap<String, PathBuf>,

    /// Item counts and recovered warnings.
    pub metrics: StageMetrics,

    /// Human-readable failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock duration, filled in by the orchestrator.
    pub duration_seconds: f64,
}

impl StageResult {
    /// Creates a result with the given status and no payload.
    #[must_use]
    pub fn new(stage_name: StageName, status: StageStatus) -> Self {
        Self {
            stage_name,
            status,
            data: BTreeMap::new(),
            file_paths: BTreeMap::new(),
            metrics: StageMetrics::default(),
            error: None,
            duration_seconds: 0.0,
        }
    }

    /// Creates a successful result.
    #[must_use]
    pub fn success(stage_name: StageName) -> Self {
        Self::new(stage_name, StageStatus::Success)
    }

    /// Creates a failed result with an error message.
    #[must_use]
    pub fn failed(stage_name: StageName, error: impl Into<String>) -> Self {
        Self::new(stage_name, StageStatus::Failed).with_error(error)
    }

    /// Creates a skipped result with a reason.
    #[must_use]
    pub fn skipped(stage_name: StageName, reason: impl Into<String>) -> Self {
        Self::new(stage_name, StageStatus::Skipped).with_data("skip_reason", reason.into())
    }

    /// Sets the error message.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Adds a summary value.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Adds an artifact path.
    #[must_use]
    pub fn with_file_path(mut self, label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.file_paths.insert(label.into(), path.into());
        self
    }

    /// Adds several artifact paths.
    #[must_use]
    pub fn with_file_paths(mut self, paths: impl IntoIterator<Item = (String, PathBuf)>) -> Self {
        self.file_paths.extend(paths);
        self
    }

    /// Sets a counter.
    #[must_use]
    pub fn with_count(mut self, key: impl Into<String>, value: u64) -> Self {
        self.metrics.counts.insert(key.into(), value);
        self
    }

    /// Appends recovered warnings.
    #[must_use]
    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = String>) -> Self {
        self.metrics.warnings.extend(warnings);
        self
    }

    /// Sets a string metric.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metrics.labels.insert(key.into(), value.into());
        self
    }

    /// Sets the wall-clock duration.
    #[must_use]
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    /// Returns true if the stage counts as completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_failed_result_carries_error() {
        let result = StageResult::failed(StageName::Extract, "boom");
        assert_eq!(result.status, StageStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert!(!result.is_completed());
    }

    #[test]
    fn test_skipped_result_records_reason() {
        let result = StageResult::skipped(StageName::Report, "nothing aggregated");
        assert_eq!(result.status, StageStatus::Skipped);
        assert_eq!(result.data["skip_reason"], "nothing aggregated");
    }

    #[test]
    fn test_builder_chain() {
        let result = StageResult::success(StageName::Fetch)
            .with_count("attempted", 4)
            .with_warnings(vec!["oura: resilience unavailable".to_string()])
            .with_file_path("whoop_raw", "data/01_raw/whoop_raw.json")
            .with_duration(1.5);

        assert_eq!(result.metrics.count("attempted"), 4);
        assert_eq!(result.metrics.count("missing"), 0);
        assert_eq!(result.metrics.warnings.len(), 1);
        assert_eq!(
            result.file_paths["whoop_raw"],
            PathBuf::from("data/01_raw/whoop_raw.json")
        );
        assert!((result.duration_seconds - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_serialize_omits_empty_sections() {
        let json = serde_json::to_value(StageResult::success(StageName::Transform)).unwrap();
        assert_eq!(json["stage_name"], "transform");
        assert_eq!(json["status"], "SUCCESS");
        assert!(json.get("error").is_none());
        assert!(json.get("file_paths").is_none());
    }
}

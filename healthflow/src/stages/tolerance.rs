//! Per-item failure isolation for stage loops.
//!
//! A stage iterates a worklist and reports each item as succeeded or failed.
//! Recovered errors that are not item failures go into `warnings`. The tally
//! then derives the stage status and error message from the counts.

use crate::core::{StageName, StageResult, StageStatus};
use serde::Serialize;
use tracing::warn;

/// A failed work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// Item name, e.g. `whoop:workouts@2025-07-02`.
    pub item: String,
    /// Error message.
    pub error: String,
}

/// Collects per-item outcomes for one stage.
#[derive(Debug, Clone, Default)]
pub struct ItemTally {
    succeeded: Vec<String>,
    failed: Vec<FailureRecord>,
    warnings: Vec<String>,
}

impl ItemTally {
    /// Creates an empty tally.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful item.
    pub fn succeed(&mut self, item: impl Into<String>) {
        self.succeeded.push(item.into());
    }

    /// Records a failed item and logs it.
    pub fn fail(&mut self, item: impl Into<String>, error: impl ToString) {
        let record = FailureRecord {
            item: item.into(),
            error: error.to_string(),
        };
        warn!(item = %record.item, error = %record.error, "Item failed");
        self.failed.push(record);
    }

    /// Records a recovered error that does not fail an item.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    /// Folds another tally into this one, keeping its order after ours.
    pub fn absorb(&mut self, other: ItemTally) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
        self.warnings.extend(other.warnings);
    }

    /// Names of the items that succeeded.
    #[must_use]
    pub fn succeeded(&self) -> &[String] {
        &self.succeeded
    }

    /// Failed items.
    #[must_use]
    pub fn failed(&self) -> &[FailureRecord] {
        &self.failed
    }

    /// Recovered warnings.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Number of items attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Derives the stage status from the counts.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        StageStatus::from_counts(self.succeeded.len(), self.failed.len())
    }

    /// Builds the error message listing failed items, if any failed.
    #[must_use]
    pub fn error_message(&self, action: &str) -> Option<String> {
        if self.failed.is_empty() {
            return None;
        }
        let items: Vec<&str> = self.failed.iter().map(|f| f.item.as_str()).collect();
        Some(format!("Failed to {action}: {}", items.join(", ")))
    }

    /// Converts the tally into a stage result.
    ///
    /// `action` completes the sentence "Failed to ..." in the error message.
    #[must_use]
    pub fn into_result(self, stage: StageName, action: &str) -> StageResult {
        let status = self.status();
        let error = self.error_message(action);
        let mut result = StageResult::new(stage, status)
            .with_count("attempted", as_count(self.attempted()))
            .with_count("succeeded", as_count(self.succeeded.len()))
            .with_count("failed", as_count(self.failed.len()));

        if status == StageStatus::Skipped {
            result = result.with_data("skip_reason", "no applicable input");
        }
        if let Some(error) = error {
            result = result.with_error(error);
        }
        if !self.failed.is_empty() {
            result = result.with_data(
                "failures",
                serde_json::to_value(&self.failed).unwrap_or_default(),
            );
        }
        result.with_warnings(self.warnings)
    }
}

/// Widens a length into a metric counter.
pub(crate) fn as_count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_all_succeeded_is_success() {
        let mut tally = ItemTally::new();
        tally.succeed("whoop");
        tally.succeed("oura");

        let result = tally.into_result(StageName::Extract, "extract data from");
        assert_eq!(result.status, StageStatus::Success);
        assert_eq!(result.error, None);
        assert_eq!(result.metrics.count("attempted"), 2);
    }

    #[test]
    fn test_mixed_is_partial_with_failed_items_listed() {
        let mut tally = ItemTally::new();
        tally.succeed("whoop");
        tally.fail("oura", "token expired");
        tally.fail("hevy", "timeout");

        let result = tally.into_result(StageName::Fetch, "fetch data from");
        assert_eq!(result.status, StageStatus::Partial);
        assert_eq!(result.error.as_deref(), Some("Failed to fetch data from: oura, hevy"));
        assert_eq!(result.metrics.count("failed"), 2);
        assert_eq!(result.data["failures"][0]["error"], "token expired");
    }

    #[test]
    fn test_all_failed_is_failed() {
        let mut tally = ItemTally::new();
        tally.fail("whoop", "offline");
        assert_eq!(tally.status(), StageStatus::Failed);
    }

    #[test]
    fn test_nothing_attempted_is_skipped() {
        let mut tally = ItemTally::new();
        tally.warn("no services requested");

        let result = tally.into_result(StageName::Transform, "transform");
        assert_eq!(result.status, StageStatus::Skipped);
        assert_eq!(result.metrics.warnings, vec!["no services requested"]);
    }

    #[test]
    fn test_warnings_do_not_change_status() {
        let mut tally = ItemTally::new();
        tally.succeed("whoop");
        tally.warn("oura: resilience unavailable");
        assert_eq!(tally.status(), StageStatus::Success);
    }

    #[test]
    fn test_absorb_preserves_order() {
        let mut first = ItemTally::new();
        first.succeed("a");
        let mut second = ItemTally::new();
        second.succeed("b");
        second.fail("c", "x");

        first.absorb(second);
        assert_eq!(first.succeeded(), ["a", "b"]);
        assert_eq!(first.failed().len(), 1);
        assert_eq!(first.attempted(), 3);
    }
}

//! Stage status and stage name enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome status of one stage execution.
///
/// The combination rule is count based rather than a quality order:
/// no failed items is `Success`, some failed items is `Partial`, all items
/// failed (or the stage itself blew up) is `Failed`, and no applicable input
/// is `Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    /// Every attempted item succeeded.
    Success,
    /// Some items succeeded and some failed.
    Partial,
    /// Every attempted item failed, or the stage failed outright.
    Failed,
    /// The stage had no applicable input.
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Partial => write!(f, "PARTIAL"),
            Self::Failed => write!(f, "FAILED"),
            Self::Skipped => write!(f, "SKIPPED"),
        }
    }
}

impl StageStatus {
    /// Derives a status from item counts.
    #[must_use]
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (0, 0) => Self::Skipped,
            (_, 0) => Self::Success,
            (0, _) => Self::Failed,
            _ => Self::Partial,
        }
    }

    /// Returns true if the stage counts as completed for overall success.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Success | Self::Partial)
    }

    /// Returns the status glyph used in run summaries.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Success => "✓",
            Self::Partial => "⚠",
            Self::Failed => "✗",
            Self::Skipped => "-",
        }
    }
}

/// The fixed set of pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Pull raw payloads from services.
    Fetch,
    /// Split raw payloads into per-type record lists.
    Extract,
    /// Coerce records into canonical typed records.
    Transform,
    /// Build one record per family per day.
    Aggregate,
    /// Render the weekly report.
    Report,
}

impl StageName {
    /// Every stage in execution order.
    pub const ALL: [StageName; 5] = [
        Self::Fetch,
        Self::Extract,
        Self::Transform,
        Self::Aggregate,
        Self::Report,
    ];

    /// Returns the lowercase stage identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::Transform => "transform",
            Self::Aggregate => "aggregate",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::Success.to_string(), "SUCCESS");
        assert_eq!(StageStatus::Partial.to_string(), "PARTIAL");
        assert_eq!(StageStatus::Failed.to_string(), "FAILED");
        assert_eq!(StageStatus::Skipped.to_string(), "SKIPPED");
    }

    #[test]
    fn test_stage_status_from_counts() {
        assert_eq!(StageStatus::from_counts(3, 0), StageStatus::Success);
        assert_eq!(StageStatus::from_counts(2, 1), StageStatus::Partial);
        assert_eq!(StageStatus::from_counts(0, 4), StageStatus::Failed);
        assert_eq!(StageStatus::from_counts(0, 0), StageStatus::Skipped);
    }

    #[test]
    fn test_stage_status_is_completed() {
        assert!(StageStatus::Success.is_completed());
        assert!(StageStatus::Partial.is_completed());
        assert!(!StageStatus::Failed.is_completed());
        assert!(!StageStatus::Skipped.is_completed());
    }

    #[test]
    fn test_stage_status_serialize() {
        let json = serde_json::to_string(&StageStatus::Partial).unwrap();
        assert_eq!(json, r#""PARTIAL""#);

        let deserialized: StageStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, StageStatus::Partial);
    }

    #[test]
    fn test_stage_name_order() {
        let names: Vec<&str> = StageName::ALL.iter().map(StageName::as_str).collect();
        assert_eq!(names, ["fetch", "extract", "transform", "aggregate", "report"]);
        assert!(StageName::Fetch < StageName::Report);
    }
}

//! Pipeline lifecycle events.
//!
//! The orchestrator emits one event when a run starts, one before and after
//! every stage, and one when the run finishes. Sinks decide what to do with
//! them: discard, log, or collect.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::core::{StageName, StageStatus};
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// A lifecycle event of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// The run began.
    RunStarted {
        /// Run identifier.
        run_id: Uuid,
        /// First day of the range.
        start_date: NaiveDate,
        /// Last day of the range.
        end_date: NaiveDate,
        /// Requested services.
        services: Vec<String>,
    },
    /// A stage is about to execute.
    StageStarted {
        /// Run identifier.
        run_id: Uuid,
        /// Stage name.
        stage: StageName,
    },
    /// A stage produced its result.
    StageFinished {
        /// Run identifier.
        run_id: Uuid,
        /// Stage name.
        stage: StageName,
        /// Result status.
        status: StageStatus,
        /// Wall-clock duration.
        duration_seconds: f64,
    },
    /// The run ended.
    RunFinished {
        /// Run identifier.
        run_id: Uuid,
        /// Overall success.
        success: bool,
        /// Wall-clock duration of the whole run.
        duration_seconds: f64,
    },
}

impl PipelineEvent {
    /// Returns the dotted event type, e.g. `stage.completed`.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "pipeline.started",
            Self::StageStarted { .. } => "stage.started",
            Self::StageFinished { .. } => "stage.completed",
            Self::RunFinished { .. } => "pipeline.completed",
        }
    }

    /// Serializes the event payload.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

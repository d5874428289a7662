//! Stage trait and the five pipeline stages.
//!
//! Stages are the fundamental units of work in a healthflow run. Each one
//! reads what earlier stages left in the [`PipelineContext`], writes its own
//! output field and returns a [`StageResult`].

mod aggregate;
mod extract;
mod fetch;
mod ports;
mod report;
mod tolerance;
mod transform;

pub use aggregate::{fingerprint, AggregateStage};
pub use extract::ExtractStage;
pub use fetch::FetchStage;
pub use ports::{
    Collaborators, Extractor, HealthService, Persistence, ReportRenderer, Transformed,
    Transformer,
};
#[cfg(test)]
pub(crate) use ports::MockPersistence;
pub use report::ReportStage;
pub use tolerance::{FailureRecord, ItemTally};
pub(crate) use tolerance::as_count;
pub use transform::TransformStage;

use crate::context::PipelineContext;
use crate::core::{StageName, StageResult};
use crate::errors::StageError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline stages.
///
/// A stage isolates its own work items and reports their outcome through the
/// returned status. `Err` is reserved for failures that stop the stage
/// itself, such as a conflicting write to the context.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> StageName;

    /// Executes the stage against the shared context.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The run context; the stage writes only its own output field
    ///
    /// # Returns
    ///
    /// The stage result. Duration is filled in by the orchestrator.
    async fn execute(&self, ctx: &mut PipelineContext) -> Result<StageResult, StageError>;
}

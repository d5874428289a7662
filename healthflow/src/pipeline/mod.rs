//! Pipeline building and execution.
//!
//! This module provides:
//! - The builder that wires collaborators into the fixed stage sequence
//! - The orchestrator that runs it
//! - The outcome returned by every run

mod builder;
mod orchestrator;
mod outcome;

pub use builder::{PipelineBuilder, DEFAULT_EXPORTS_DIR};
pub use orchestrator::Orchestrator;
pub use outcome::{PipelineOutcome, RunSummary};

//! Context management for pipeline execution.
//!
//! This module provides:
//! - The inclusive date range a run covers
//! - The mutable pipeline context threaded through every stage
//! - Write-once storage for per-stage outputs

mod bags;
mod execution;
mod range;

pub use bags::StageData;
pub use execution::{
    ExtractedRecords, PipelineContext, RawPayloads, ServiceCoverage, TransformedRecords,
};
pub use range::DateRange;

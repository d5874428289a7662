//! Testing utilities for healthflow pipelines.
//!
//! This module provides:
//! - Stub services with failure injection
//! - Recording persistence and misbehaving aggregators and stages
//! - Record fixtures and result assertions

mod assertions;
pub mod fixtures;
pub mod mocks;

pub use assertions::{
    assert_outcome_stage, assert_run_succeeded, assert_stage_completed, assert_stage_count,
    assert_stage_order, assert_stage_status,
};
pub use mocks::{
    FailingAggregator, FailingStage, PanickingStage, RecordingPersistence, RecordingStage,
    StubService,
};

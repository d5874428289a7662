//! Test assertions for stage results and run outcomes.

use crate::core::{StageName, StageResult, StageStatus};
use crate::pipeline::PipelineOutcome;

/// Asserts that the result has the expected status.
pub fn assert_stage_status(result: &StageResult, expected: StageStatus) {
    assert_eq!(
        result.status, expected,
        "Expected {} to be {:?}, got {:?} (error: {:?})",
        result.stage_name, expected, result.status, result.error
    );
}

/// Asserts that the result completed (SUCCESS or PARTIAL).
pub fn assert_stage_completed(result: &StageResult) {
    assert!(
        result.is_completed(),
        "Expected {} to complete, got {:?} (error: {:?})",
        result.stage_name,
        result.status,
        result.error
    );
}

/// Asserts that the stage's named counter has the expected value.
pub fn assert_stage_count(result: &StageResult, key: &str, expected: u64) {
    assert_eq!(
        result.metrics.count(key),
        expected,
        "Expected {} count '{}' to be {}. Counts: {:?}",
        result.stage_name,
        key,
        expected,
        result.metrics.counts
    );
}

/// Asserts that the outcome recorded exactly these stages, in order.
pub fn assert_stage_order(outcome: &PipelineOutcome, expected: &[StageName]) {
    let actual: Vec<StageName> = outcome.stage_results().iter().map(|r| r.stage_name).collect();
    assert_eq!(actual, expected, "Unexpected stage order");
}

/// Asserts the status of one stage in an outcome.
pub fn assert_outcome_stage(outcome: &PipelineOutcome, stage: StageName, expected: StageStatus) {
    match outcome.stage_result(stage) {
        Some(result) => assert_stage_status(result, expected),
        None => panic!("Stage {stage} was not recorded"),
    }
}

/// Asserts that the outcome is successful.
pub fn assert_run_succeeded(outcome: &PipelineOutcome) {
    assert!(
        outcome.success(),
        "Expected run to succeed. Stages: {:?}",
        outcome
            .stage_results()
            .iter()
            .map(|r| (r.stage_name, r.status, r.error.clone()))
            .collect::<Vec<_>>()
    );
}

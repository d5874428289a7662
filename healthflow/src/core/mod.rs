//! Core domain model types for healthflow.
//!
//! This module contains the fundamental types threaded through the pipeline:
//! - Stage status and stage name enums
//! - Stage results with builder methods
//! - Canonical records and daily aggregates

mod aggregates;
mod records;
mod result;
mod status;

pub use aggregates::{AggregationFamily, DayRecord, MacrosActivityDay, RecoveryDay, TrainingDay};
pub use records::{
    ActivityRecord, CanonicalRecord, CleanRecord, DataType, ExerciseRecord, NutritionRecord,
    RecoveryRecord, ResilienceRecord, SleepRecord, SportType, WeightRecord, WorkoutRecord,
};
pub use result::{StageMetrics, StageResult};
pub use status::{StageName, StageStatus};

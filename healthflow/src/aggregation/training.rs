//! Daily training totals.

use super::{Aggregator, DayInputs};
use crate::core::{AggregationFamily, DataType, DayRecord, TrainingDay, WorkoutRecord};
use crate::errors::AggregationError;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Emits a `training_metrics` record only on days with at least one workout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainingAggregator;

impl Aggregator for TrainingAggregator {
    fn name(&self) -> &str {
        "training"
    }

    fn family(&self) -> AggregationFamily {
        AggregationFamily::TrainingMetrics
    }

    fn required_data_types(&self) -> BTreeSet<DataType> {
        BTreeSet::from([DataType::Workouts])
    }

    fn aggregate_day(
        &self,
        date: NaiveDate,
        inputs: &DayInputs<'_>,
    ) -> Result<Option<DayRecord>, AggregationError> {
        let workouts = inputs.typed::<WorkoutRecord>(self.name())?;
        let Some(primary) = super::longest_workout(&workouts) else {
            return Ok(None);
        };

        let strains: Vec<f64> = workouts.iter().filter_map(|w| w.strain_score).collect();
        let calories: Vec<f64> = workouts.iter().filter_map(|w| w.calories).collect();

        Ok(Some(DayRecord::Training(TrainingDay {
            date,
            sport: primary.sport,
            title: primary.title.clone(),
            duration_minutes: workouts.iter().map(|w| w.duration_minutes).sum(),
            workout_count: u32::try_from(workouts.len()).unwrap_or(u32::MAX),
            strain: mean(&strains),
            calories_burned: (!calories.is_empty()).then(|| calories.iter().sum()),
        })))
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SportType;
    use crate::testing::fixtures;

    #[test]
    fn test_no_workouts_no_record() {
        let result = TrainingAggregator
            .aggregate_day(fixtures::day(5), &DayInputs::new())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_totals_and_primary_sport() {
        let date = fixtures::day(5);
        let run = fixtures::workout(date, SportType::Running, 30.0, Some(10.0));
        let lift = fixtures::workout(date, SportType::StrengthTraining, 65.0, Some(14.0));
        let inputs = DayInputs::new().with_slice(DataType::Workouts, vec![&run, &lift]);

        let Some(DayRecord::Training(day)) = TrainingAggregator.aggregate_day(date, &inputs).unwrap()
        else {
            panic!("expected a training record");
        };
        assert_eq!(day.sport, SportType::StrengthTraining);
        assert_eq!(day.workout_count, 2);
        assert!((day.duration_minutes - 95.0).abs() < f64::EPSILON);
        assert_eq!(day.strain, Some(12.0));
        assert_eq!(day.calories_burned, None);
    }

    #[test]
    fn test_mean_of_nothing_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }
}

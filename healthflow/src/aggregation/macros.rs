//! Daily macros, activity and weight.

use super::{Aggregator, DayInputs};
use crate::core::{
    ActivityRecord, AggregationFamily, DataType, DayRecord, MacrosActivityDay, NutritionRecord,
    WeightRecord, WorkoutRecord,
};
use crate::errors::AggregationError;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Emits one `macros_activity` record every day, zero-filled when the day
/// has no nutrition or activity data.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacrosActivityAggregator;

impl Aggregator for MacrosActivityAggregator {
    fn name(&self) -> &str {
        "macros"
    }

    fn family(&self) -> AggregationFamily {
        AggregationFamily::MacrosActivity
    }

    fn required_data_types(&self) -> BTreeSet<DataType> {
        [
            DataType::Nutrition,
            DataType::Activity,
            DataType::Weight,
            DataType::Workouts,
        ]
        .into_iter()
        .collect()
    }

    fn aggregate_day(
        &self,
        date: NaiveDate,
        inputs: &DayInputs<'_>,
    ) -> Result<Option<DayRecord>, AggregationError> {
        let nutrition = inputs.typed::<NutritionRecord>(self.name())?.into_iter().next();
        let activity = inputs.typed::<ActivityRecord>(self.name())?.into_iter().next();
        let weight = latest_weight(&inputs.typed::<WeightRecord>(self.name())?);
        let workouts = inputs.typed::<WorkoutRecord>(self.name())?;
        let longest = super::longest_workout(&workouts);

        Ok(Some(DayRecord::MacrosActivity(MacrosActivityDay {
            date,
            calories: nutrition.map_or(0.0, |n| n.calories),
            protein: nutrition.map_or(0.0, |n| n.protein),
            carbs: nutrition.map_or(0.0, |n| n.carbs),
            fat: nutrition.map_or(0.0, |n| n.fat),
            alcohol: nutrition.and_then(|n| n.alcohol).unwrap_or(0.0),
            steps: activity.and_then(|a| a.steps).unwrap_or(0.0),
            active_calories: activity.and_then(|a| a.active_calories),
            weight_kg: weight.map(|w| w.weight_kg),
            sport_type: longest.map(|w| w.sport),
        })))
    }
}

/// The day's last measurement; readings without a timestamp sort first.
fn latest_weight<'a>(weights: &[&'a WeightRecord]) -> Option<&'a WeightRecord> {
    weights.iter().copied().max_by_key(|w| w.timestamp)
}

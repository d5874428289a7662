//! Daily aggregate records, one per family per calendar day.

use super::SportType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An aggregation family: a grouping that yields at most one record per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationFamily {
    /// Nutrition, activity and weight.
    MacrosActivity,
    /// Recovery, sleep and resilience.
    RecoveryMetrics,
    /// Workouts.
    TrainingMetrics,
}

impl AggregationFamily {
    /// Returns the family identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MacrosActivity => "macros_activity",
            Self::RecoveryMetrics => "recovery_metrics",
            Self::TrainingMetrics => "training_metrics",
        }
    }
}

impl fmt::Display for AggregationFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Macros, activity and weight for one day.
///
/// Numeric nutrition and step fields are zero-filled when no source record
/// exists for the day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacrosActivityDay {
    /// Calendar day.
    pub date: NaiveDate,
    /// Energy intake (kcal).
    pub calories: f64,
    /// Protein (g).
    pub protein: f64,
    /// Carbohydrates (g).
    pub carbs: f64,
    /// Fat (g).
    pub fat: f64,
    /// Alcohol (g).
    pub alcohol: f64,
    /// Step count.
    pub steps: f64,
    /// Active energy expenditure (kcal).
    pub active_calories: Option<f64>,
    /// Latest body weight of the day (kg).
    pub weight_kg: Option<f64>,
    /// Sport of the day's longest workout.
    pub sport_type: Option<SportType>,
}

/// Recovery and sleep for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryDay {
    /// Calendar day.
    pub date: NaiveDate,
    /// Recovery score (0-100).
    pub recovery: Option<f64>,
    /// Heart rate variability, RMSSD (ms).
    pub hrv: Option<f64>,
    /// Resting heart rate (bpm).
    pub resting_hr: Option<f64>,
    /// Sleep need (minutes).
    pub sleep_need_minutes: Option<f64>,
    /// Actual sleep (minutes).
    pub sleep_actual_minutes: Option<f64>,
    /// Resilience level label.
    pub resilience_level: Option<String>,
}

/// Training totals for one day with at least one workout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingDay {
    /// Calendar day.
    pub date: NaiveDate,
    /// Sport of the longest workout.
    pub sport: SportType,
    /// Title of the longest workout, if the provider gave one.
    pub title: Option<String>,
    /// Total duration across workouts (minutes).
    pub duration_minutes: f64,
    /// Number of workouts.
    pub workout_count: u32,
    /// Mean strain over workouts that reported one.
    pub strain: Option<f64>,
    /// Summed calories over workouts that reported them.
    pub calories_burned: Option<f64>,
}

/// A daily aggregate record of any family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DayRecord {
    /// See [`MacrosActivityDay`].
    MacrosActivity(MacrosActivityDay),
    /// See [`RecoveryDay`].
    Recovery(RecoveryDay),
    /// See [`TrainingDay`].
    Training(TrainingDay),
}

impl DayRecord {
    /// Returns the record's calendar day.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::MacrosActivity(r) => r.date,
            Self::Recovery(r) => r.date,
            Self::Training(r) => r.date,
        }
    }

    /// Returns the family the record belongs to.
    #[must_use]
    pub fn family(&self) -> AggregationFamily {
        match self {
            Self::MacrosActivity(_) => AggregationFamily::MacrosActivity,
            Self::Recovery(_) => AggregationFamily::RecoveryMetrics,
            Self::Training(_) => AggregationFamily::TrainingMetrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_identifiers() {
        assert_eq!(AggregationFamily::MacrosActivity.to_string(), "macros_activity");
        assert_eq!(AggregationFamily::RecoveryMetrics.as_str(), "recovery_metrics");
        assert_eq!(
            serde_json::to_string(&AggregationFamily::TrainingMetrics).unwrap(),
            r#""training_metrics""#
        );
    }

    #[test]
    fn test_day_record_family_and_date() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
        let record = DayRecord::Training(TrainingDay {
            date,
            sport: SportType::Running,
            title: None,
            duration_minutes: 45.0,
            workout_count: 1,
            strain: Some(11.2),
            calories_burned: None,
        });
        assert_eq!(record.family(), AggregationFamily::TrainingMetrics);
        assert_eq!(record.date(), date);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sport"], "running");
        assert_eq!(json["date"], "2025-07-04");
    }
}

//! Record builders for tests.
//!
//! Canonical builders return [`CleanRecord`]s ready to drop into
//! `transformed_data`; the `raw_*` builders return the JSON a service would
//! hand to the extract stage.

use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};

use crate::core::{
    ActivityRecord, CleanRecord, NutritionRecord, RecoveryRecord, ResilienceRecord, SleepRecord,
    SportType, WeightRecord, WorkoutRecord,
};

/// Day `n` of July 2025, counting from 1. Larger values run past July.
#[must_use]
pub fn day(n: u32) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap_or_default();
    first + Duration::days(i64::from(n) - 1)
}

/// A workout without title, calories or heart rate.
#[must_use]
pub fn workout(date: NaiveDate, sport: SportType, minutes: f64, strain: Option<f64>) -> CleanRecord {
    WorkoutRecord {
        date,
        sport,
        duration_minutes: minutes,
        title: None,
        strain_score: strain,
        calories: None,
        average_heart_rate: None,
        max_heart_rate: None,
    }
    .into()
}

/// Daily nutrition totals.
#[must_use]
pub fn nutrition(date: NaiveDate, calories: f64, protein: f64, carbs: f64, fat: f64) -> CleanRecord {
    NutritionRecord {
        date,
        calories,
        protein,
        carbs,
        fat,
        alcohol: None,
        fiber: None,
        sugar: None,
    }
    .into()
}

/// Daily steps.
#[must_use]
pub fn activity(date: NaiveDate, steps: f64) -> CleanRecord {
    ActivityRecord {
        date,
        steps: Some(steps),
        active_calories: None,
        total_calories: None,
    }
    .into()
}

/// A weight measured at `hour:00`.
#[must_use]
pub fn weight_at(date: NaiveDate, hour: u32, kg: f64) -> CleanRecord {
    WeightRecord {
        date,
        timestamp: date.and_hms_opt(hour, 0, 0),
        weight_kg: kg,
        body_fat_percentage: None,
        muscle_mass_kg: None,
    }
    .into()
}

/// A recovery score.
#[must_use]
pub fn recovery(date: NaiveDate, score: f64) -> CleanRecord {
    RecoveryRecord {
        date,
        recovery_score: Some(score),
        hrv_rmssd: None,
        resting_hr: None,
    }
    .into()
}

/// A night's sleep.
#[must_use]
pub fn sleep(date: NaiveDate, need_minutes: f64, actual_minutes: f64) -> CleanRecord {
    SleepRecord {
        date,
        total_sleep_minutes: Some(actual_minutes),
        time_in_bed_minutes: None,
        sleep_need_minutes: Some(need_minutes),
        sleep_score: None,
        nap: false,
    }
    .into()
}

/// A nap.
#[must_use]
pub fn nap(date: NaiveDate, minutes: f64) -> CleanRecord {
    SleepRecord {
        date,
        total_sleep_minutes: Some(minutes),
        time_in_bed_minutes: Some(minutes),
        sleep_need_minutes: None,
        sleep_score: None,
        nap: true,
    }
    .into()
}

/// A resilience level.
#[must_use]
pub fn resilience(date: NaiveDate, level: &str) -> CleanRecord {
    ResilienceRecord {
        date,
        sleep_recovery: None,
        daytime_recovery: None,
        stress: None,
        level: Some(level.to_string()),
    }
    .into()
}

/// Raw workout JSON.
#[must_use]
pub fn raw_workout(date: NaiveDate, sport: &str, minutes: f64, strain: f64) -> Value {
    json!({
        "date": date.to_string(),
        "sport": sport,
        "duration_minutes": minutes,
        "strain_score": strain,
    })
}

/// Raw nutrition JSON.
#[must_use]
pub fn raw_nutrition(date: NaiveDate, calories: f64, protein: f64, carbs: f64, fat: f64) -> Value {
    json!({
        "date": date.to_string(),
        "calories": calories,
        "protein": protein,
        "carbs": carbs,
        "fat": fat,
    })
}

/// Raw recovery JSON.
#[must_use]
pub fn raw_recovery(date: NaiveDate, score: f64, hrv: f64, resting_hr: f64) -> Value {
    json!({
        "date": date.to_string(),
        "recovery_score": score,
        "hrv_rmssd": hrv,
        "resting_hr": resting_hr,
    })
}

/// Raw sleep JSON.
#[must_use]
pub fn raw_sleep(date: NaiveDate, need_minutes: f64, actual_minutes: f64) -> Value {
    json!({
        "date": date.to_string(),
        "sleep_need_minutes": need_minutes,
        "total_sleep_minutes": actual_minutes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_counts_from_one() {
        assert_eq!(day(1).to_string(), "2025-07-01");
        assert_eq!(day(32).to_string(), "2025-08-01");
    }

    #[test]
    fn test_raw_workout_transforms() {
        let record: WorkoutRecord =
            serde_json::from_value(raw_workout(day(2), "running", 30.0, 8.5)).unwrap();
        assert_eq!(record.sport, SportType::Running);
        assert_eq!(record.strain_score, Some(8.5));
    }
}

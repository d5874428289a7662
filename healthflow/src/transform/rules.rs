//! Validation ranges and normalisation for each canonical record.

use crate::core::{
    ActivityRecord, CanonicalRecord, ExerciseRecord, NutritionRecord, RecoveryRecord,
    ResilienceRecord, SleepRecord, WeightRecord, WorkoutRecord,
};
use std::ops::RangeInclusive;

/// Plausibility checks and clean-up applied after coercion.
pub trait Validate: CanonicalRecord {
    /// Returns the reason the record must be dropped, if any.
    fn check(&self) -> Result<(), String>;

    /// Rounds and tidies a record that passed `check`.
    #[must_use]
    fn normalize(self) -> Self;
}

const WORKOUT_MINUTES: RangeInclusive<f64> = 0.0..=480.0;
const WORKOUT_CALORIES: RangeInclusive<f64> = 0.0..=2000.0;
const STRAIN: RangeInclusive<f64> = 0.0..=21.0;
const WORKOUT_HEART_RATE: RangeInclusive<f64> = 25.0..=250.0;
const RESTING_HEART_RATE: RangeInclusive<f64> = 30.0..=200.0;
const PERCENT: RangeInclusive<f64> = 0.0..=100.0;
const DAY_MINUTES: RangeInclusive<f64> = 0.0..=1440.0;
const DAILY_CALORIES: RangeInclusive<f64> = 0.0..=10_000.0;
const PROTEIN: RangeInclusive<f64> = 0.0..=500.0;
const CARBS: RangeInclusive<f64> = 0.0..=1000.0;
const FAT: RangeInclusive<f64> = 0.0..=500.0;
const BODY_WEIGHT_KG: RangeInclusive<f64> = 0.001..=500.0;
const STEPS: RangeInclusive<f64> = 0.0..=200_000.0;

fn within(field: &str, value: f64, range: &RangeInclusive<f64>) -> Result<(), String> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "{field} {value} outside {}-{}",
            range.start(),
            range.end()
        ))
    }
}

fn within_opt(field: &str, value: Option<f64>, range: &RangeInclusive<f64>) -> Result<(), String> {
    value.map_or(Ok(()), |v| within(field, v, range))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn round_opt(value: Option<f64>, decimals: i32) -> Option<f64> {
    value.map(|v| round_to(v, decimals))
}

impl Validate for WorkoutRecord {
    fn check(&self) -> Result<(), String> {
        within("duration_minutes", self.duration_minutes, &WORKOUT_MINUTES)?;
        within_opt("calories", self.calories, &WORKOUT_CALORIES)?;
        within_opt("strain_score", self.strain_score, &STRAIN)?;
        within_opt("average_heart_rate", self.average_heart_rate, &WORKOUT_HEART_RATE)?;
        within_opt("max_heart_rate", self.max_heart_rate, &WORKOUT_HEART_RATE)
    }

    fn normalize(mut self) -> Self {
        self.duration_minutes = round_to(self.duration_minutes, 1);
        self.strain_score = round_opt(self.strain_score, 2);
        self.calories = round_opt(self.calories, 0);
        self.average_heart_rate = round_opt(self.average_heart_rate, 0);
        self.max_heart_rate = round_opt(self.max_heart_rate, 0);
        self.title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self
    }
}

impl Validate for ActivityRecord {
    fn check(&self) -> Result<(), String> {
        within_opt("steps", self.steps, &STEPS)?;
        within_opt("active_calories", self.active_calories, &DAILY_CALORIES)?;
        within_opt("total_calories", self.total_calories, &DAILY_CALORIES)
    }

    fn normalize(mut self) -> Self {
        self.steps = round_opt(self.steps, 0);
        self.active_calories = round_opt(self.active_calories, 0);
        self.total_calories = round_opt(self.total_calories, 0);
        self
    }
}

impl Validate for WeightRecord {
    fn check(&self) -> Result<(), String> {
        within("weight_kg", self.weight_kg, &BODY_WEIGHT_KG)?;
        within_opt("body_fat_percentage", self.body_fat_percentage, &PERCENT)
    }

    fn normalize(mut self) -> Self {
        self.weight_kg = round_to(self.weight_kg, 3);
        self.body_fat_percentage = round_opt(self.body_fat_percentage, 2);
        self.muscle_mass_kg = round_opt(self.muscle_mass_kg, 2);
        self
    }
}

impl Validate for RecoveryRecord {
    fn check(&self) -> Result<(), String> {
        within_opt("recovery_score", self.recovery_score, &PERCENT)?;
        within_opt("resting_hr", self.resting_hr, &RESTING_HEART_RATE)
    }

    fn normalize(mut self) -> Self {
        self.hrv_rmssd = round_opt(self.hrv_rmssd, 1);
        self.resting_hr = round_opt(self.resting_hr, 0);
        self
    }
}

impl Validate for SleepRecord {
    fn check(&self) -> Result<(), String> {
        within_opt("total_sleep_minutes", self.total_sleep_minutes, &DAY_MINUTES)?;
        within_opt("time_in_bed_minutes", self.time_in_bed_minutes, &DAY_MINUTES)?;
        within_opt("sleep_need_minutes", self.sleep_need_minutes, &DAY_MINUTES)?;
        within_opt("sleep_score", self.sleep_score, &PERCENT)
    }

    fn normalize(mut self) -> Self {
        self.total_sleep_minutes = round_opt(self.total_sleep_minutes, 0);
        self.time_in_bed_minutes = round_opt(self.time_in_bed_minutes, 0);
        self.sleep_need_minutes = round_opt(self.sleep_need_minutes, 0);
        self
    }
}

impl Validate for ExerciseRecord {
    fn check(&self) -> Result<(), String> {
        if self.exercise_name.trim().is_empty() {
            return Err("exercise_name is empty".to_string());
        }
        within_opt("weight_kg", self.weight_kg, &(0.0..=1000.0))
    }

    fn normalize(mut self) -> Self {
        self.exercise_name = self.exercise_name.trim().to_string();
        self.set_type = self.set_type.trim().to_ascii_lowercase();
        self.weight_kg = round_opt(self.weight_kg, 2);
        self
    }
}

impl Validate for NutritionRecord {
    fn check(&self) -> Result<(), String> {
        within("calories", self.calories, &DAILY_CALORIES)?;
        within("protein", self.protein, &PROTEIN)?;
        within("carbs", self.carbs, &CARBS)?;
        within("fat", self.fat, &FAT)
    }

    fn normalize(mut self) -> Self {
        self.calories = round_to(self.calories, 0);
        self.protein = round_to(self.protein, 1);
        self.carbs = round_to(self.carbs, 1);
        self.fat = round_to(self.fat, 1);
        self.alcohol = round_opt(self.alcohol, 1);
        self.fiber = round_opt(self.fiber, 1);
        self.sugar = round_opt(self.sugar, 1);
        self
    }
}

impl Validate for ResilienceRecord {
    fn check(&self) -> Result<(), String> {
        within_opt("sleep_recovery", self.sleep_recovery, &PERCENT)?;
        within_opt("daytime_recovery", self.daytime_recovery, &PERCENT)?;
        within_opt("stress", self.stress, &PERCENT)
    }

    fn normalize(mut self) -> Self {
        self.level = self
            .level
            .map(|l| l.trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty());
        self
    }
}

//! Adapter from the canonical daily aggregates to the weekly report tables.
//!
//! The report template predates the aggregation model, so the tables keep
//! its conventions: a trailing seven-day window that stops before the run's
//! end date, `MM-DD` dates with a weekday label, pounds, hours and `HH:MM`
//! durations. Nothing here re-derives aggregation logic.

#![allow(missing_docs)]

use crate::context::DateRange;
use crate::core::{
    AggregationFamily, DayRecord, MacrosActivityDay, RecoveryDay, SportType, TrainingDay,
};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Kilograms to pounds.
pub const KG_TO_LB: f64 = 2.204_622_621_8;

/// Days covered by the report window.
pub const REPORT_WINDOW_DAYS: u64 = 7;

/// One row of the macronutrients and activity table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacrosRow {
    /// `MM-DD`.
    pub date: String,
    /// Three-letter weekday, e.g. `Mon`.
    pub day: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub alcohol: f64,
    /// Sport label of the day's main workout, `Rest` without one.
    pub activity: String,
    pub steps: f64,
    /// Body weight in pounds.
    pub weight: Option<f64>,
}

/// One row of the recovery table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryRow {
    pub date: String,
    pub day: String,
    pub recovery: Option<f64>,
    pub resilience_level: Option<String>,
    pub hrv: Option<f64>,
    /// Resting heart rate.
    pub hr: Option<f64>,
    /// Sleep need in hours.
    pub sleep_need: Option<f64>,
    /// Actual sleep in hours.
    pub sleep_actual: Option<f64>,
}

/// One row of the training log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingRow {
    pub date: String,
    pub day: String,
    /// Workout title, or the sport label when the workout had none.
    pub sport: String,
    /// `HH:MM`.
    pub duration: String,
    pub strain: Option<f64>,
    /// Whether the day's main workout was strength training.
    #[serde(skip)]
    pub strength: bool,
}

/// The tables the report renderer consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyTables {
    /// Window the rows were filtered to.
    pub window: DateRange,
    pub macros: Vec<MacrosRow>,
    pub recovery: Vec<RecoveryRow>,
    pub training: Vec<TrainingRow>,
}

impl LegacyTables {
    /// Returns true if every table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty() && self.recovery.is_empty() && self.training.is_empty()
    }

    /// Total number of rows across tables.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.macros.len() + self.recovery.len() + self.training.len()
    }
}

/// Builds [`LegacyTables`] from aggregated data.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyReportAdapter;

impl LegacyReportAdapter {
    /// The seven days strictly before `end_date`.
    #[must_use]
    pub fn window(end_date: NaiveDate) -> DateRange {
        let last = end_date.checked_sub_days(Days::new(1)).unwrap_or(end_date);
        let first = end_date
            .checked_sub_days(Days::new(REPORT_WINDOW_DAYS))
            .unwrap_or(last);
        DateRange::new(first, last)
    }

    /// Converts aggregated records into report tables.
    #[must_use]
    pub fn adapt(
        aggregated: &BTreeMap<AggregationFamily, Vec<DayRecord>>,
        end_date: NaiveDate,
    ) -> LegacyTables {
        let window = Self::window(end_date);

        let mut tables = LegacyTables {
            window,
            macros: Vec::new(),
            recovery: Vec::new(),
            training: Vec::new(),
        };

        for record in in_window(aggregated, AggregationFamily::MacrosActivity, window) {
            if let DayRecord::MacrosActivity(day) = record {
                tables.macros.push(macros_row(day));
            }
        }
        for record in in_window(aggregated, AggregationFamily::RecoveryMetrics, window) {
            if let DayRecord::Recovery(day) = record {
                tables.recovery.push(recovery_row(day));
            }
        }
        for record in in_window(aggregated, AggregationFamily::TrainingMetrics, window) {
            if let DayRecord::Training(day) = record {
                tables.training.push(training_row(day));
            }
        }

        debug!(
            %window,
            macros = tables.macros.len(),
            recovery = tables.recovery.len(),
            training = tables.training.len(),
            "Adapted aggregates for report"
        );
        tables
    }
}

fn in_window(
    aggregated: &BTreeMap<AggregationFamily, Vec<DayRecord>>,
    family: AggregationFamily,
    window: DateRange,
) -> impl Iterator<Item = &DayRecord> {
    aggregated
        .get(&family)
        .into_iter()
        .flatten()
        .filter(move |record| window.contains(record.date()))
}

fn short_date(date: NaiveDate) -> String {
    date.format("%m-%d").to_string()
}

fn weekday(date: NaiveDate) -> String {
    date.format("%a").to_string()
}

/// Title-cased activity label, `Rest` when there is none.
#[must_use]
pub fn activity_label(sport: Option<SportType>) -> String {
    sport
        .map(|s| s.label())
        .filter(|label| !label.trim().is_empty())
        .unwrap_or_else(|| "Rest".to_string())
}

/// Pounds, rounded to two decimals.
#[must_use]
pub fn kg_to_lb(kg: f64) -> f64 {
    (kg * KG_TO_LB * 100.0).round() / 100.0
}

/// Formats whole minutes as `HH:MM`; fractions of a minute are dropped.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_duration(minutes: f64) -> String {
    let total = if minutes.is_finite() && minutes > 0.0 {
        minutes.trunc() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn macros_row(day: &MacrosActivityDay) -> MacrosRow {
    MacrosRow {
        date: short_date(day.date),
        day: weekday(day.date),
        calories: day.calories,
        protein: day.protein,
        carbs: day.carbs,
        fat: day.fat,
        alcohol: day.alcohol,
        activity: activity_label(day.sport_type),
        steps: day.steps,
        weight: day.weight_kg.map(kg_to_lb),
    }
}

fn recovery_row(day: &RecoveryDay) -> RecoveryRow {
    RecoveryRow {
        date: short_date(day.date),
        day: weekday(day.date),
        recovery: day.recovery,
        resilience_level: day.resilience_level.clone(),
        hrv: day.hrv,
        hr: day.resting_hr,
        sleep_need: day.sleep_need_minutes.map(|m| m / 60.0),
        sleep_actual: day.sleep_actual_minutes.map(|m| m / 60.0),
    }
}

fn training_row(day: &TrainingDay) -> TrainingRow {
    let sport = day
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| day.sport.label());
    TrainingRow {
        date: short_date(day.date),
        day: weekday(day.date),
        sport,
        duration: format_duration(day.duration_minutes),
        strain: day.strain,
        strength: day.sport.is_strength(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    #[test]
    fn test_window_excludes_end_date() {
        let window = LegacyReportAdapter::window(day(10));
        assert_eq!(window.start(), day(3));
        assert_eq!(window.end(), day(9));
        assert_eq!(window.len(), 7);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(95.0), "01:35");
        assert_eq!(format_duration(45.9), "00:45");
        assert_eq!(format_duration(0.0), "00:00");
        assert_eq!(format_duration(-3.0), "00:00");
        assert_eq!(format_duration(f64::NAN), "00:00");
    }

    #[test]
    fn test_activity_label() {
        assert_eq!(activity_label(Some(SportType::StrengthTraining)), "Strength Training");
        assert_eq!(activity_label(None), "Rest");
    }

    #[test]
    fn test_kg_to_lb() {
        assert!((kg_to_lb(80.0) - 176.37).abs() < 0.01);
    }
}

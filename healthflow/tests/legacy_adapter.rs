//! Legacy adapter conversions and windowing.

use healthflow::core::{
    AggregationFamily, DayRecord, MacrosActivityDay, RecoveryDay, SportType, TrainingDay,
};
use healthflow::legacy::{kg_to_lb, LegacyReportAdapter};
use healthflow::testing::fixtures::day;
use std::collections::BTreeMap;

fn macros(n: u32, weight_kg: Option<f64>) -> DayRecord {
    DayRecord::MacrosActivity(MacrosActivityDay {
        date: day(n),
        calories: 2100.0,
        protein: 140.0,
        carbs: 220.0,
        fat: 70.0,
        alcohol: 0.0,
        steps: 9000.0,
        active_calories: None,
        weight_kg,
        sport_type: None,
    })
}

fn aggregated() -> BTreeMap<AggregationFamily, Vec<DayRecord>> {
    let mut aggregated = BTreeMap::new();
    aggregated.insert(
        AggregationFamily::MacrosActivity,
        (1..=10).map(|n| macros(n, Some(80.0))).collect(),
    );
    aggregated.insert(
        AggregationFamily::RecoveryMetrics,
        vec![DayRecord::Recovery(RecoveryDay {
            date: day(5),
            recovery: Some(64.0),
            hrv: Some(52.0),
            resting_hr: Some(50.0),
            sleep_need_minutes: Some(420.0),
            sleep_actual_minutes: Some(390.0),
            resilience_level: None,
        })],
    );
    aggregated.insert(
        AggregationFamily::TrainingMetrics,
        vec![DayRecord::Training(TrainingDay {
            date: day(6),
            sport: SportType::Cycling,
            title: None,
            duration_minutes: 95.0,
            workout_count: 1,
            strain: Some(12.0),
            calories_burned: None,
        })],
    );
    aggregated
}

#[test]
fn test_window_excludes_end_date() {
    let tables = LegacyReportAdapter::adapt(&aggregated(), day(10));

    let dates: Vec<&str> = tables.macros.iter().map(|r| r.date.as_str()).collect();
    assert_eq!(
        dates,
        vec!["07-03", "07-04", "07-05", "07-06", "07-07", "07-08", "07-09"]
    );
    assert_eq!(tables.window.to_string(), "2025-07-03..2025-07-09");
}

#[test]
fn test_unit_conversions() {
    let tables = LegacyReportAdapter::adapt(&aggregated(), day(10));

    let weight = tables.macros[0].weight.unwrap();
    assert!((weight - 176.37).abs() < 0.01);
    assert!((kg_to_lb(80.0) - 176.37).abs() < 0.01);

    let recovery = &tables.recovery[0];
    assert_eq!(recovery.sleep_need, Some(7.0));
    assert_eq!(recovery.sleep_actual, Some(6.5));

    assert_eq!(tables.training[0].duration, "01:35");
}

#[test]
fn test_labels_and_defaults() {
    let tables = LegacyReportAdapter::adapt(&aggregated(), day(10));

    assert_eq!(tables.macros[0].activity, "Rest");
    assert_eq!(tables.macros[0].day, "Thu");
    assert_eq!(tables.training[0].sport, "Cycling");
    assert_eq!(tables.recovery[0].resilience_level, None);
}

#[test]
fn test_nothing_in_window() {
    let tables = LegacyReportAdapter::adapt(&aggregated(), day(30));
    assert!(tables.is_empty());
    assert_eq!(tables.row_count(), 0);
}

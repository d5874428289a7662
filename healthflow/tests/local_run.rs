//! A full run from local export files to artifacts on disk.

use healthflow::config::PipelineConfig;
use healthflow::core::{StageName, StageStatus};
use healthflow::persistence::{AGGREGATED_DIR, RAW_DIR, REPORTS_DIR, TRANSFORMED_DIR};
use healthflow::pipeline::PipelineBuilder;
use healthflow::testing::fixtures::{day, raw_nutrition, raw_sleep, raw_workout};
use serde_json::Value;
use std::fs;
use std::path::Path;

fn write_export(dir: &Path, service: &str, kind: &str, records: Vec<Value>) {
    let service_dir = dir.join(service);
    fs::create_dir_all(&service_dir).unwrap();
    fs::write(
        service_dir.join(format!("{kind}.json")),
        serde_json::to_vec(&Value::Array(records)).unwrap(),
    )
    .unwrap();
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn test_local_exports_produce_report() {
    let input = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();

    write_export(
        input.path(),
        "hevy",
        "workouts",
        (2..=6)
            .map(|n| raw_workout(day(n), "strength_training", 60.0, 11.0))
            .collect(),
    );
    write_export(
        input.path(),
        "nutrition",
        "nutrition",
        (1..=8)
            .map(|n| raw_nutrition(day(n), 2300.0, 160.0, 250.0, 75.0))
            .collect(),
    );
    write_export(
        input.path(),
        "whoop",
        "sleep",
        (1..=8).map(|n| raw_sleep(day(n), 480.0, 450.0)).collect(),
    );

    let config = PipelineConfig::new()
        .with_services(["whoop", "hevy", "nutrition"])
        .with_input_dir(input.path())
        .with_data_dir(data.path());
    let outcome = PipelineBuilder::local(&config)
        .build()
        .run_until(day(8), 8, config.services.clone(), true, false)
        .await;

    // whoop has no workouts or recovery export; those kinds are warnings only
    let fetch = outcome.stage_result(StageName::Fetch).unwrap();
    assert_eq!(fetch.status, StageStatus::Success);
    assert!(!fetch.metrics.warnings.is_empty());
    assert!(outcome.success(), "{:?}", outcome.stage_results());

    assert_eq!(files_in(&data.path().join(RAW_DIR)).len(), 3);
    assert_eq!(files_in(&data.path().join(TRANSFORMED_DIR)).len(), 3);
    assert_eq!(files_in(&data.path().join(AGGREGATED_DIR)).len(), 3);
    assert_eq!(
        files_in(&data.path().join(REPORTS_DIR)),
        vec!["health_report_2025-07-08.md"]
    );

    let report =
        fs::read_to_string(data.path().join(REPORTS_DIR).join("health_report_2025-07-08.md"))
            .unwrap();
    assert!(report.contains("Strength Training Days: 5"));
    assert!(report.contains("## Training Log"));
}

#[tokio::test]
async fn test_csv_disabled_still_writes_report() {
    let input = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    write_export(
        input.path(),
        "nutrition",
        "nutrition",
        vec![raw_nutrition(day(2), 2000.0, 120.0, 200.0, 60.0)],
    );

    let config = PipelineConfig::new()
        .with_services(["nutrition"])
        .with_input_dir(input.path())
        .with_data_dir(data.path())
        .with_csv(false);
    let outcome = PipelineBuilder::local(&config)
        .build()
        .run_until(day(3), 3, ["nutrition"], false, false)
        .await;

    assert!(outcome.success());
    assert!(files_in(&data.path().join(RAW_DIR)).is_empty());
    assert_eq!(files_in(&data.path().join(REPORTS_DIR)).len(), 1);
}

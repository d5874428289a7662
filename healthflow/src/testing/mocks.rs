//! Test doubles for services, persistence, aggregators and stages.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use crate::aggregation::{Aggregator, DayInputs};
use crate::context::{DateRange, PipelineContext, RawPayloads};
use crate::core::{
    AggregationFamily, CleanRecord, DataType, DayRecord, MacrosActivityDay, RecoveryDay,
    SportType, StageName, StageResult, TrainingDay,
};
use crate::errors::{AggregationError, FetchError, PersistenceError, StageError};
use crate::stages::{HealthService, Persistence, Stage};

/// A service serving canned records, with failure injection.
///
/// Records are filtered by their `date` field against the requested window.
/// A window that contains a failing day fails as a whole.
#[derive(Debug, Clone)]
pub struct StubService {
    id: String,
    records: BTreeMap<String, Vec<Value>>,
    unsupported: BTreeSet<String>,
    failing_days: BTreeSet<NaiveDate>,
    authenticated: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubService {
    /// Creates an authenticated service with no data.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            records: BTreeMap::new(),
            unsupported: BTreeSet::new(),
            failing_days: BTreeSet::new(),
            authenticated: true,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Serves `records` for `kind`.
    #[must_use]
    pub fn with_records(mut self, kind: impl Into<String>, records: Vec<Value>) -> Self {
        self.records.entry(kind.into()).or_default().extend(records);
        self
    }

    /// Offers `kind` but reports it as unsupported.
    #[must_use]
    pub fn with_unsupported(mut self, kind: impl Into<String>) -> Self {
        self.unsupported.insert(kind.into());
        self
    }

    /// Fails every fetch whose window contains `day`.
    #[must_use]
    pub fn failing_on(mut self, day: NaiveDate) -> Self {
        self.failing_days.insert(day);
        self
    }

    /// Reports missing credentials.
    #[must_use]
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Fetches made so far, as `kind@window`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

fn record_day(record: &Value) -> Option<NaiveDate> {
    let raw = record.get("date")?.as_str()?;
    NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok()
}

#[async_trait]
impl HealthService for StubService {
    fn id(&self) -> &str {
        &self.id
    }

    fn data_kinds(&self) -> Vec<String> {
        let kinds: BTreeSet<&String> = self.records.keys().chain(&self.unsupported).collect();
        kinds.into_iter().cloned().collect()
    }

    async fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn fetch(&self, kind: &str, window: DateRange) -> Result<Value, FetchError> {
        self.calls.lock().push(format!("{kind}@{window}"));

        if self.unsupported.contains(kind) {
            return Err(FetchError::Unsupported {
                service: self.id.clone(),
                kind: kind.to_string(),
            });
        }
        if let Some(day) = self.failing_days.iter().find(|d| window.contains(**d)) {
            return Err(FetchError::request(
                &self.id,
                kind,
                format!("injected failure on {day}"),
            ));
        }

        let records = self
            .records
            .get(kind)
            .into_iter()
            .flatten()
            .filter(|r| record_day(r).is_some_and(|d| window.contains(d)))
            .cloned()
            .collect();
        Ok(Value::Array(records))
    }
}

/// One artifact written to [`RecordingPersistence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    /// Stage directory, e.g. `01_raw`.
    pub directory: &'static str,
    /// Artifact label, e.g. `whoop_raw`.
    pub label: String,
    /// Records, payload kinds or bytes written.
    pub size: usize,
}

/// In-memory persistence that records every save.
#[derive(Debug, Default)]
pub struct RecordingPersistence {
    saved: Mutex<Vec<SavedArtifact>>,
    failing: bool,
}

impl RecordingPersistence {
    /// Creates a persistence that accepts every save.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a persistence that rejects every save.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    /// Artifacts saved so far.
    #[must_use]
    pub fn saved(&self) -> Vec<SavedArtifact> {
        self.saved.lock().clone()
    }

    /// Labels of the artifacts saved so far.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.saved.lock().iter().map(|a| a.label.clone()).collect()
    }

    fn record(
        &self,
        directory: &'static str,
        label: String,
        size: usize,
    ) -> Result<PathBuf, PersistenceError> {
        if self.failing {
            return Err(PersistenceError::Encoding {
                artifact: label,
                message: "persistence disabled".to_string(),
            });
        }
        let path = PathBuf::from(directory).join(&label);
        self.saved.lock().push(SavedArtifact {
            directory,
            label,
            size,
        });
        Ok(path)
    }
}

impl Persistence for RecordingPersistence {
    fn save_raw(
        &self,
        service: &str,
        payload: &RawPayloads,
        _timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError> {
        self.record("01_raw", format!("{service}_raw"), payload.len())
    }

    fn save_extracted(
        &self,
        service: &str,
        data_type: &str,
        records: &[Value],
        _timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError> {
        self.record(
            "02_extracted",
            format!("{service}_{data_type}_extracted"),
            records.len(),
        )
    }

    fn save_transformed(
        &self,
        service: &str,
        data_type: DataType,
        records: &[CleanRecord],
        _timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError> {
        self.record(
            "03_transformed",
            format!("{service}_{data_type}_transformed"),
            records.len(),
        )
    }

    fn save_aggregated(
        &self,
        family: AggregationFamily,
        records: &[DayRecord],
        _timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError> {
        self.record("04_aggregated", family.to_string(), records.len())
    }

    fn save_report(
        &self,
        end_date: NaiveDate,
        content: &str,
        _timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError> {
        self.record(
            "05_reports",
            format!("health_report_{end_date}"),
            content.len(),
        )
    }
}

/// An aggregator that misbehaves on demand.
///
/// By default it has nothing to report for any day.
#[derive(Debug, Clone)]
pub struct FailingAggregator {
    name: String,
    family: AggregationFamily,
    failing_days: BTreeSet<NaiveDate>,
    panics: bool,
    dated: Option<NaiveDate>,
}

impl FailingAggregator {
    /// Creates an aggregator for `family` that reads workouts.
    #[must_use]
    pub fn new(name: impl Into<String>, family: AggregationFamily) -> Self {
        Self {
            name: name.into(),
            family,
            failing_days: BTreeSet::new(),
            panics: false,
            dated: None,
        }
    }

    /// Returns an error for `day`.
    #[must_use]
    pub fn failing_on(mut self, day: NaiveDate) -> Self {
        self.failing_days.insert(day);
        self
    }

    /// Panics on every day.
    #[must_use]
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    /// Emits a record dated `day` whatever day is being aggregated.
    #[must_use]
    pub fn dated(mut self, day: NaiveDate) -> Self {
        self.dated = Some(day);
        self
    }
}

/// An empty record of `family` dated `date`.
#[must_use]
pub fn blank_record(family: AggregationFamily, date: NaiveDate) -> DayRecord {
    match family {
        AggregationFamily::MacrosActivity => DayRecord::MacrosActivity(MacrosActivityDay {
            date,
            calories: 0.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
            alcohol: 0.0,
            steps: 0.0,
            active_calories: None,
            weight_kg: None,
            sport_type: None,
        }),
        AggregationFamily::RecoveryMetrics => DayRecord::Recovery(RecoveryDay {
            date,
            recovery: None,
            hrv: None,
            resting_hr: None,
            sleep_need_minutes: None,
            sleep_actual_minutes: None,
            resilience_level: None,
        }),
        AggregationFamily::TrainingMetrics => DayRecord::Training(TrainingDay {
            date,
            sport: SportType::Unknown,
            title: None,
            duration_minutes: 0.0,
            workout_count: 0,
            strain: None,
            calories_burned: None,
        }),
    }
}

impl Aggregator for FailingAggregator {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> AggregationFamily {
        self.family
    }

    fn required_data_types(&self) -> BTreeSet<DataType> {
        BTreeSet::from([DataType::Workouts])
    }

    fn aggregate_day(
        &self,
        date: NaiveDate,
        _inputs: &DayInputs<'_>,
    ) -> Result<Option<DayRecord>, AggregationError> {
        if self.panics {
            panic!("{} panicked on {date}", self.name);
        }
        if self.failing_days.contains(&date) {
            return Err(AggregationError::Failed {
                aggregator: self.name.clone(),
                date,
                message: "injected failure".to_string(),
            });
        }
        Ok(self.dated.map(|day| blank_record(self.family, day)))
    }
}

/// A stage that returns `Err` without touching the context.
#[derive(Debug, Clone)]
pub struct FailingStage {
    name: StageName,
    message: String,
}

impl FailingStage {
    /// Creates a failing stage.
    #[must_use]
    pub fn new(name: StageName, message: impl Into<String>) -> Self {
        Self {
            name,
            message: message.into(),
        }
    }
}

#[async_trait]
impl Stage for FailingStage {
    fn name(&self) -> StageName {
        self.name
    }

    async fn execute(&self, _ctx: &mut PipelineContext) -> Result<StageResult, StageError> {
        Err(StageError::new(self.name.as_str(), self.message.clone()))
    }
}

/// A stage that panics.
#[derive(Debug, Clone)]
pub struct PanickingStage {
    name: StageName,
}

impl PanickingStage {
    /// Creates a panicking stage.
    #[must_use]
    pub fn new(name: StageName) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Stage for PanickingStage {
    fn name(&self) -> StageName {
        self.name
    }

    async fn execute(&self, _ctx: &mut PipelineContext) -> Result<StageResult, StageError> {
        panic!("{} stage blew up", self.name);
    }
}

/// A stage that records how often it ran and returns a fixed result.
#[derive(Debug)]
pub struct RecordingStage {
    name: StageName,
    result: StageResult,
    calls: Mutex<usize>,
}

impl RecordingStage {
    /// Creates a stage returning `result`.
    #[must_use]
    pub fn new(result: StageResult) -> Self {
        Self {
            name: result.stage_name,
            result,
            calls: Mutex::new(0),
        }
    }

    /// Returns the number of times the stage ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> StageName {
        self.name
    }

    async fn execute(&self, _ctx: &mut PipelineContext) -> Result<StageResult, StageError> {
        *self.calls.lock() += 1;
        Ok(self.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::day;
    use serde_json::json;

    #[tokio::test]
    async fn test_stub_filters_by_window() {
        let stub = StubService::new("whoop").with_records(
            "sleep",
            vec![json!({"date": "2025-07-01"}), json!({"date": "2025-07-02"})],
        );

        let payload = stub.fetch("sleep", DateRange::single(day(2))).await.unwrap();
        assert_eq!(payload.as_array().unwrap().len(), 1);
        assert_eq!(stub.calls(), vec!["sleep@2025-07-02"]);
    }

    #[tokio::test]
    async fn test_stub_failure_injection() {
        let stub = StubService::new("whoop")
            .with_records("sleep", vec![])
            .with_unsupported("cycles")
            .failing_on(day(2));

        assert_eq!(stub.data_kinds(), vec!["cycles", "sleep"]);
        assert!(stub.fetch("sleep", DateRange::new(day(1), day(3))).await.is_err());
        assert!(stub.fetch("sleep", DateRange::single(day(3))).await.is_ok());
        assert!(stub
            .fetch("cycles", DateRange::single(day(3)))
            .await
            .unwrap_err()
            .is_unsupported());
    }

    #[test]
    fn test_recording_persistence() {
        let persistence = RecordingPersistence::new();
        let ts = day(1).and_hms_opt(8, 0, 0).unwrap();
        persistence.save_report(day(1), "# Report", ts).unwrap();
        assert_eq!(persistence.labels(), vec!["health_report_2025-07-01"]);

        let failing = RecordingPersistence::failing();
        assert!(failing.save_report(day(1), "# Report", ts).is_err());
        assert!(failing.saved().is_empty());
    }
}

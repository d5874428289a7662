//! The mutable unit of work threaded through every stage.

use super::{DateRange, StageData};
use crate::core::{AggregationFamily, CleanRecord, DataType, DayRecord, StageName, StageResult};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Raw payload items of one service, keyed by data kind.
pub type RawPayloads = BTreeMap<String, Vec<Value>>;

/// Extracted records of one service, keyed by extractor output key.
pub type ExtractedRecords = BTreeMap<String, Vec<Value>>;

/// Canonical records of one service, keyed by data type.
pub type TransformedRecords = BTreeMap<DataType, Vec<CleanRecord>>;

/// Which stage outputs exist for one service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceCoverage {
    /// `raw_data` holds the service.
    pub raw: bool,
    /// `extracted_data` holds the service.
    pub extracted: bool,
    /// `transformed_data` holds the service.
    pub transformed: bool,
}

/// The context for one pipeline run.
///
/// Each stage owns one output field and writes it once; everything written by
/// earlier stages is read-only to later ones. `stage_results` keeps insertion
/// order, which is execution order.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Unique identifier of the run.
    pub run_id: Uuid,
    /// Local time the run started; stamps persisted artifacts.
    pub started_at: NaiveDateTime,
    /// First day of the requested range.
    pub start_date: NaiveDate,
    /// Last day of the requested range (inclusive).
    pub end_date: NaiveDate,
    /// Service identifiers to process, deduplicated in request order.
    pub services: Vec<String>,
    /// Persist intermediate artifacts.
    pub enable_csv: bool,
    /// Verbose diagnostics.
    pub debug_mode: bool,
    /// Fetch output: service -> kind -> payload items.
    pub raw_data: StageData<RawPayloads>,
    /// Extract output: service -> data type id -> records.
    pub extracted_data: StageData<ExtractedRecords>,
    /// Transform output: service -> data type -> canonical records.
    pub transformed_data: StageData<TransformedRecords>,
    /// Aggregate output: family -> one record per day.
    pub aggregated_data: BTreeMap<AggregationFamily, Vec<DayRecord>>,
    file_paths: BTreeMap<String, PathBuf>,
    stage_results: Vec<StageResult>,
}

impl PipelineContext {
    /// Creates a fresh context for a date range.
    #[must_use]
    pub fn new<I, S>(range: DateRange, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for service in services {
            let service = service.into();
            if !unique.contains(&service) {
                unique.push(service);
            }
        }

        Self {
            run_id: Uuid::new_v4(),
            started_at: Local::now().naive_local(),
            start_date: range.start(),
            end_date: range.end(),
            services: unique,
            enable_csv: true,
            debug_mode: false,
            raw_data: StageData::new(),
            extracted_data: StageData::new(),
            transformed_data: StageData::new(),
            aggregated_data: BTreeMap::new(),
            file_paths: BTreeMap::new(),
            stage_results: Vec::new(),
        }
    }

    /// Sets whether intermediate artifacts are persisted.
    #[must_use]
    pub fn with_csv(mut self, enable_csv: bool) -> Self {
        self.enable_csv = enable_csv;
        self
    }

    /// Sets debug mode.
    #[must_use]
    pub fn with_debug(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    /// Returns the requested date range.
    #[must_use]
    pub fn date_range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    /// Number of days in the requested range.
    #[must_use]
    pub fn days_count(&self) -> usize {
        self.date_range().len()
    }

    /// Appends a stage result and merges its artifact paths.
    pub fn add_stage_result(&mut self, result: StageResult) {
        self.merge_file_paths(
            result
                .file_paths
                .iter()
                .map(|(label, path)| (label.clone(), path.clone())),
        );
        self.stage_results.push(result);
    }

    /// Results recorded so far, in execution order.
    #[must_use]
    pub fn stage_results(&self) -> &[StageResult] {
        &self.stage_results
    }

    /// Looks up the result of a stage.
    #[must_use]
    pub fn stage_result(&self, stage: StageName) -> Option<&StageResult> {
        self.stage_results.iter().find(|r| r.stage_name == stage)
    }

    /// Merges artifact paths; existing labels are only replaced per label.
    pub fn merge_file_paths(&mut self, paths: impl IntoIterator<Item = (String, PathBuf)>) {
        self.file_paths.extend(paths);
    }

    /// All artifact paths recorded so far.
    #[must_use]
    pub fn file_paths(&self) -> &BTreeMap<String, PathBuf> {
        &self.file_paths
    }

    /// Collects the canonical records of one type across every service.
    ///
    /// Services are visited in key order so the result is deterministic.
    #[must_use]
    pub fn records_of(&self, data_type: DataType) -> Vec<&CleanRecord> {
        self.transformed_data
            .iter()
            .filter_map(|(_, by_type)| by_type.get(&data_type))
            .flatten()
            .collect()
    }

    /// Total number of aggregated records across families.
    #[must_use]
    pub fn aggregated_count(&self) -> usize {
        self.aggregated_data.values().map(Vec::len).sum()
    }

    /// Reports which stage outputs exist for each requested service.
    #[must_use]
    pub fn services_processed(&self) -> BTreeMap<String, ServiceCoverage> {
        self.services
            .iter()
            .map(|service| {
                let coverage = ServiceCoverage {
                    raw: self.raw_data.contains_key(service),
                    extracted: self.extracted_data.contains_key(service),
                    transformed: self.transformed_data.contains_key(service),
                };
                (service.clone(), coverage)
            })
            .collect()
    }
}

//! File-backed artifact storage.
//!
//! Layout under the data directory:
//!
//! ```text
//! 01_raw/{service}_raw_{stamp}.json
//! 02_extracted/{service}_{type}_extracted_{stamp}.csv
//! 03_transformed/{service}_{type}_transformed_{stamp}.csv
//! 04_aggregated/{family}_{stamp}.csv
//! 05_reports/health_report_{end_date}.md
//! ```
//!
//! CSV columns are the union of the records' field names, sorted.

use crate::context::RawPayloads;
use crate::core::{AggregationFamily, CleanRecord, DataType, DayRecord};
use crate::errors::PersistenceError;
use crate::stages::Persistence;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stage directory for raw payloads.
pub const RAW_DIR: &str = "01_raw";
/// Stage directory for extracted records.
pub const EXTRACTED_DIR: &str = "02_extracted";
/// Stage directory for canonical records.
pub const TRANSFORMED_DIR: &str = "03_transformed";
/// Stage directory for daily aggregates.
pub const AGGREGATED_DIR: &str = "04_aggregated";
/// Stage directory for rendered reports.
pub const REPORTS_DIR: &str = "05_reports";

/// Writes artifacts below a data directory.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    root: PathBuf,
}

impl FilePersistence {
    /// Creates a persistence rooted at `root`. Directories are created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write(&self, dir: &str, file_name: String, content: &[u8]) -> Result<PathBuf, PersistenceError> {
        let dir = self.root.join(dir);
        std::fs::create_dir_all(&dir).map_err(|source| PersistenceError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = dir.join(file_name);
        std::fs::write(&path, content).map_err(|source| PersistenceError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = content.len(), "Wrote artifact");
        Ok(path)
    }
}

fn stamp(timestamp: NaiveDateTime) -> String {
    timestamp.format("%Y%m%d_%H%M%S").to_string()
}

fn to_values<T: Serialize>(artifact: &str, records: &[T]) -> Result<Vec<Value>, PersistenceError> {
    records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()
        .map_err(|e| PersistenceError::Encoding {
            artifact: artifact.to_string(),
            message: e.to_string(),
        })
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Renders JSON objects as CSV. Non-object records land in a `value` column.
pub fn records_to_csv(artifact: &str, records: &[Value]) -> Result<Vec<u8>, PersistenceError> {
    let encoding = |message: String| PersistenceError::Encoding {
        artifact: artifact.to_string(),
        message,
    };

    let mut columns: BTreeSet<&str> = BTreeSet::new();
    for record in records {
        match record.as_object() {
            Some(fields) => columns.extend(fields.keys().map(String::as_str)),
            None => {
                columns.insert("value");
            }
        }
    }

    let mut wtr = csv::Writer::from_writer(vec![]);
    if !columns.is_empty() {
        wtr.write_record(&columns).map_err(|e| encoding(e.to_string()))?;
    }
    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|column| match record.as_object() {
                Some(fields) => cell(fields.get(*column)),
                None if *column == "value" => cell(Some(record)),
                None => String::new(),
            })
            .collect();
        wtr.write_record(&row).map_err(|e| encoding(e.to_string()))?;
    }
    wtr.into_inner()
        .map_err(|e| encoding(format!("failed to flush CSV writer: {e}")))
}

impl Persistence for FilePersistence {
    fn save_raw(
        &self,
        service: &str,
        payload: &RawPayloads,
        timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError> {
        let artifact = format!("{service}_raw");
        let json = serde_json::to_vec_pretty(payload).map_err(|e| PersistenceError::Encoding {
            artifact: artifact.clone(),
            message: e.to_string(),
        })?;
        self.write(RAW_DIR, format!("{artifact}_{}.json", stamp(timestamp)), &json)
    }

    fn save_extracted(
        &self,
        service: &str,
        data_type: &str,
        records: &[Value],
        timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError> {
        let artifact = format!("{service}_{data_type}_extracted");
        let csv = records_to_csv(&artifact, records)?;
        self.write(EXTRACTED_DIR, format!("{artifact}_{}.csv", stamp(timestamp)), &csv)
    }

    fn save_transformed(
        &self,
        service: &str,
        data_type: DataType,
        records: &[CleanRecord],
        timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError> {
        let artifact = format!("{service}_{data_type}_transformed");
        let values = to_values(&artifact, records)?;
        let csv = records_to_csv(&artifact, &values)?;
        self.write(TRANSFORMED_DIR, format!("{artifact}_{}.csv", stamp(timestamp)), &csv)
    }

    fn save_aggregated(
        &self,
        family: AggregationFamily,
        records: &[DayRecord],
        timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError> {
        let artifact = family.as_str().to_string();
        let values = to_values(&artifact, records)?;
        let csv = records_to_csv(&artifact, &values)?;
        self.write(AGGREGATED_DIR, format!("{artifact}_{}.csv", stamp(timestamp)), &csv)
    }

    fn save_report(
        &self,
        end_date: NaiveDate,
        content: &str,
        _timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError> {
        self.write(
            REPORTS_DIR,
            format!("health_report_{}.md", end_date.format("%Y-%m-%d")),
            content.as_bytes(),
        )
    }
}

//! A service backed by JSON exports on disk.
//!
//! Layout: `{input_dir}/{service}/{kind}.json`, each file a JSON array of
//! records carrying a `date` field (`YYYY-MM-DD`, or an RFC 3339 timestamp
//! whose date part is used).

use crate::context::DateRange;
use crate::errors::FetchError;
use crate::stages::HealthService;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Data kinds read for the well-known services.
fn default_kinds(service: &str) -> Option<&'static [&'static str]> {
    let kinds: &'static [&'static str] = match service {
        "whoop" => &["workouts", "recovery", "sleep"],
        "oura" => &["activity", "resilience", "workouts"],
        "withings" => &["weight"],
        "hevy" => &["workouts", "exercises"],
        "nutrition" => &["nutrition"],
        _ => return None,
    };
    Some(kinds)
}

/// Reads one service's exports from a directory.
#[derive(Debug, Clone)]
pub struct LocalExportService {
    id: String,
    root: PathBuf,
    kinds: Vec<String>,
}

impl LocalExportService {
    /// Creates a service reading `{input_dir}/{id}/`.
    ///
    /// Well-known services use their usual data kinds; any other service
    /// offers every `*.json` file found in its directory.
    #[must_use]
    pub fn new(input_dir: impl AsRef<Path>, id: impl Into<String>) -> Self {
        let id = id.into();
        let root = input_dir.as_ref().join(&id);
        let kinds = match default_kinds(&id) {
            Some(kinds) => kinds.iter().map(ToString::to_string).collect(),
            None => discover_kinds(&root),
        };
        Self { id, root, kinds }
    }

    /// Overrides the data kinds.
    #[must_use]
    pub fn with_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    fn path_for(&self, kind: &str) -> PathBuf {
        self.root.join(format!("{kind}.json"))
    }
}

fn discover_kinds(root: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut kinds: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    kinds.sort();
    kinds
}

/// Reads the calendar day of a record, if it has one.
fn record_date(record: &Value) -> Option<NaiveDate> {
    let raw = record.get("date")?.as_str()?;
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[async_trait]
impl HealthService for LocalExportService {
    fn id(&self) -> &str {
        &self.id
    }

    fn data_kinds(&self) -> Vec<String> {
        self.kinds.clone()
    }

    async fn is_authenticated(&self) -> bool {
        tokio::fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn fetch(&self, kind: &str, window: DateRange) -> Result<Value, FetchError> {
        let path = self.path_for(kind);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::Unsupported {
                    service: self.id.clone(),
                    kind: kind.to_string(),
                });
            }
            Err(e) => return Err(FetchError::request(&self.id, kind, e.to_string())),
        };

        let parsed: Value = serde_json::from_str(&content)
            .map_err(|e| FetchError::request(&self.id, kind, format!("{}: {e}", path.display())))?;
        let Value::Array(records) = parsed else {
            return Err(FetchError::request(
                &self.id,
                kind,
                format!("{} is not a JSON array", path.display()),
            ));
        };

        let in_window: Vec<Value> = records
            .into_iter()
            .filter(|record| record_date(record).is_some_and(|d| window.contains(d)))
            .collect();
        debug!(service = %self.id, kind, %window, count = in_window.len(), "Read local export");
        Ok(Value::Array(in_window))
    }
}

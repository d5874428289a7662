//! Run configuration.
//!
//! Every field has a default so a partial JSON file is enough; the CLI layers
//! its flags on top of whatever the file provides.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Service identifiers processed when none are requested explicitly.
pub const DEFAULT_SERVICES: [&str; 5] = ["whoop", "oura", "withings", "hevy", "nutrition"];

/// Longest run accepted, in days (ten years).
pub const MAX_DAYS: u32 = 3660;

/// Configuration for the fetch stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Size of each fetch window in days.
    #[serde(default = "default_chunk_days")]
    pub chunk_days: u32,
    /// Services fetched concurrently; 1 means strictly sequential.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_services: usize,
}

fn default_chunk_days() -> u32 {
    1
}

fn default_max_concurrent() -> usize {
    1
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            chunk_days: default_chunk_days(),
            max_concurrent_services: default_max_concurrent(),
        }
    }
}

impl FetchConfig {
    /// Sets the fetch window size.
    #[must_use]
    pub fn with_chunk_days(mut self, chunk_days: u32) -> Self {
        self.chunk_days = chunk_days;
        self
    }

    /// Sets the service fan-out bound.
    #[must_use]
    pub fn with_max_concurrent_services(mut self, max: usize) -> Self {
        self.max_concurrent_services = max;
        self
    }
}

/// Configuration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of days to process, ending today.
    #[serde(default = "default_days")]
    pub days: u32,
    /// Services to process.
    #[serde(default = "default_services")]
    pub services: Vec<String>,
    /// Persist intermediate artifacts.
    #[serde(default = "default_true")]
    pub enable_csv: bool,
    /// Verbose diagnostics.
    #[serde(default)]
    pub debug_mode: bool,
    /// Run the report stage.
    #[serde(default = "default_true")]
    pub include_report: bool,
    /// Root directory for persisted artifacts.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory of local exports used as the data source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<PathBuf>,
    /// Fetch stage settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

fn default_days() -> u32 {
    8
}

fn default_services() -> Vec<String> {
    DEFAULT_SERVICES.iter().map(ToString::to_string).collect()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            services: default_services(),
            enable_csv: true,
            debug_mode: false,
            include_report: true,
            data_dir: default_data_dir(),
            input_dir: None,
            fetch: FetchConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the number of days.
    #[must_use]
    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    /// Replaces the service list.
    #[must_use]
    pub fn with_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = services.into_iter().map(Into::into).collect();
        self
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

    /// Sets whether the report stage runs.
    #[must_use]
    pub fn with_report(mut self, include_report: bool) -> Self {
        self.include_report = include_report;
        self
    }

    /// Sets the artifact root.
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Sets the local export directory.
    #[must_use]
    pub fn with_input_dir(mut self, input_dir: impl Into<PathBuf>) -> Self {
        self.input_dir = Some(input_dir.into());
        self
    }

    /// Sets the fetch settings.
    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    /// Checks the configuration for values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.days == 0 {
            return Err(ConfigError::Invalid {
                field: "days",
                message: "must be at least 1".to_string(),
            });
        }
        if self.days > MAX_DAYS {
            return Err(ConfigError::Invalid {
                field: "days",
                message: format!("must be at most {MAX_DAYS}"),
            });
        }
        if self.services.is_empty() {
            return Err(ConfigError::Invalid {
                field: "services",
                message: "at least one service is required".to_string(),
            });
        }
        if let Some(blank) = self.services.iter().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "services",
                message: format!("blank service identifier {blank:?}"),
            });
        }
        if self.fetch.chunk_days == 0 {
            return Err(ConfigError::Invalid {
                field: "fetch.chunk_days",
                message: "must be at least 1".to_string(),
            });
        }
        if self.fetch.max_concurrent_services == 0 {
            return Err(ConfigError::Invalid {
                field: "fetch.max_concurrent_services",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.days, 8);
        assert_eq!(config.services.len(), 5);
        assert!(config.enable_csv);
        assert!(config.include_report);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.fetch.chunk_days, 1);
        assert_eq!(config.fetch.max_concurrent_services, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"days": 3, "fetch": {"max_concurrent_services": 4}}"#)
                .unwrap();
        assert_eq!(config.days, 3);
        assert_eq!(config.services, default_services());
        assert_eq!(config.fetch.chunk_days, 1);
        assert_eq!(config.fetch.max_concurrent_services, 4);
    }

    #[test]
    fn test_validate_rejects_zero_days() {
        let err = PipelineConfig::new().with_days(0).validate().unwrap_err();
        assert!(err.to_string().contains("days"));
    }

    #[test]
    fn test_validate_bounds_days() {
        assert!(PipelineConfig::new().with_days(MAX_DAYS).validate().is_ok());
        let err = PipelineConfig::new()
            .with_days(MAX_DAYS + 1)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("at most"));
    }

    #[test]
    fn test_oversized_chunk_is_valid() {
        let config =
            PipelineConfig::new().with_fetch(FetchConfig::default().with_chunk_days(u32::MAX));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = PipelineConfig::new()
            .with_fetch(FetchConfig::default().with_max_concurrent_services(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_services() {
        let config = PipelineConfig::new().with_services(Vec::<String>::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"services": ["whoop"], "enable_csv": false}}"#).unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.services, vec!["whoop"]);
        assert!(!config.enable_csv);
    }

    #[test]
    fn test_from_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = PipelineConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}

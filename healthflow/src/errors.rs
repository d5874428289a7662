//! Error types for the healthflow pipeline.
//!
//! Errors are recovered as close to their origin as possible: a single
//! service, data type, or day fails and the surrounding loop carries on.
//! Only [`StageError`] ever reaches the orchestrator, which turns it into a
//! failed stage result instead of propagating it further.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::{AggregationFamily, DataType};

/// The umbrella error type for healthflow operations.
#[derive(Debug, Error)]
pub enum HealthflowError {
    /// A service fetch failed.
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// A raw payload could not be extracted.
    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    /// Extracted records could not be transformed.
    #[error("{0}")]
    Transformation(#[from] TransformationError),

    /// A day could not be aggregated.
    #[error("{0}")]
    Aggregation(#[from] AggregationError),

    /// A stage failed outright.
    #[error("{0}")]
    Stage(#[from] StageError),

    /// Writing an artifact failed.
    #[error("{0}")]
    Persistence(#[from] PersistenceError),

    /// Rendering the report failed.
    #[error("{0}")]
    Render(#[from] RenderError),

    /// The configuration is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The aggregator registry rejected a registration.
    #[error("{0}")]
    Registry(#[from] RegistryError),
}

/// Error raised when a single service call fails.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The service has no valid credentials.
    #[error("service '{service}' is not authenticated")]
    NotAuthenticated {
        /// Service identifier.
        service: String,
    },

    /// The service does not offer the requested data kind.
    ///
    /// This is the "feature not available" signal. The fetch stage records it
    /// as a warning and never counts it as a failed item.
    #[error("service '{service}' does not provide '{kind}'")]
    Unsupported {
        /// Service identifier.
        service: String,
        /// Requested data kind.
        kind: String,
    },

    /// The request itself failed (network, HTTP status, decoding).
    #[error("request to '{service}' for '{kind}' failed: {message}")]
    Request {
        /// Service identifier.
        service: String,
        /// Requested data kind.
        kind: String,
        /// Underlying failure.
        message: String,
    },

    /// No collaborator is registered for the service identifier.
    #[error("unknown service '{0}'")]
    UnknownService(String),
}

impl FetchError {
    /// Creates a request failure.
    #[must_use]
    pub fn request(
        service: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Request {
            service: service.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error means "not available" rather than "failed".
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

/// Error raised when a raw payload does not have the expected shape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// No extractor is registered for the service.
    #[error("no extractor registered for service '{0}'")]
    MissingExtractor(String),

    /// A payload item did not match the expected shape.
    #[error("unexpected shape in '{kind}' item {index}: {message}")]
    UnexpectedShape {
        /// Raw data kind being extracted.
        kind: String,
        /// Position of the offending item.
        index: usize,
        /// Description of the mismatch.
        message: String,
    },
}

/// Error raised when a record fails coercion or normalisation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformationError {
    /// A record could not be coerced into its canonical type.
    #[error("{data_type} record {index} could not be coerced: {message}")]
    Coercion {
        /// Target canonical type.
        data_type: DataType,
        /// Position of the offending record.
        index: usize,
        /// Deserializer message.
        message: String,
    },

    /// A custom transformer rejected its input.
    #[error("{data_type} transformation failed: {message}")]
    Rejected {
        /// Target canonical type.
        data_type: DataType,
        /// Reason given by the transformer.
        message: String,
    },
}

/// Error raised when one family cannot be aggregated for one day.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregationError {
    /// A resolved input slice contained a record of the wrong type.
    #[error("{aggregator}: expected {expected} records, found {found}")]
    UnexpectedRecord {
        /// Aggregator name.
        aggregator: String,
        /// Expected data type.
        expected: DataType,
        /// Data type actually found.
        found: DataType,
    },

    /// The aggregator returned a record for a different day.
    #[error("{family} record dated {found} returned while aggregating {expected}")]
    DateMismatch {
        /// Family of the returned record.
        family: AggregationFamily,
        /// Day being aggregated.
        expected: NaiveDate,
        /// Date on the returned record.
        found: NaiveDate,
    },

    /// The aggregator returned a record of another family.
    #[error("aggregator '{aggregator}' returned a {found} record, expected {expected}")]
    FamilyMismatch {
        /// Aggregator name.
        aggregator: String,
        /// Family declared in the registry.
        expected: AggregationFamily,
        /// Family of the returned record.
        found: AggregationFamily,
    },

    /// The aggregation logic itself failed.
    #[error("{aggregator} failed for {date}: {message}")]
    Failed {
        /// Aggregator name.
        aggregator: String,
        /// Day being aggregated.
        date: NaiveDate,
        /// Failure description.
        message: String,
    },
}

/// Error raised when a stage cannot complete its own loop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Stage {stage} failed: {message}")]
pub struct StageError {
    /// Stage that failed.
    pub stage: String,
    /// Failure description.
    pub message: String,
}

impl StageError {
    /// Creates a new stage error.
    #[must_use]
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

/// Error raised when writing to an existing key in write-once stage data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Data conflict: key '{key}' already written")]
pub struct DataConflictError {
    /// The conflicting key.
    pub key: String,
}

impl DataConflictError {
    /// Creates a new data conflict error.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Wraps the conflict as a stage failure.
    #[must_use]
    pub fn into_stage(self, stage: &str) -> StageError {
        StageError::new(stage, self.to_string())
    }
}

/// Error raised by a persistence collaborator.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem failure.
    #[error("IO error writing {path}: {source}")]
    Io {
        /// Target path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Encoding the artifact failed.
    #[error("encoding {artifact} failed: {message}")]
    Encoding {
        /// Artifact label.
        artifact: String,
        /// Encoder message.
        message: String,
    },
}

/// Error raised by a report renderer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("report rendering failed: {0}")]
pub struct RenderError(pub String);

/// Error raised when a configuration is invalid or unreadable.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds an invalid value.
    #[error("invalid value for '{field}': {message}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The configuration file could not be read.
    #[error("cannot read config {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for the schema.
    #[error("cannot parse config {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Error raised when registering an aggregator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// An aggregator with the same name is already registered.
    #[error("aggregator '{0}' is already registered")]
    DuplicateName(String),

    /// Another aggregator already produces this family.
    #[error("family '{family}' is already produced by '{owner}'")]
    DuplicateFamily {
        /// Family.
        family: AggregationFamily,
        /// Aggregator already registered for it.
        owner: String,
    },

    /// The aggregator declared no data requirements.
    #[error("aggregator '{0}' declares no required data types")]
    NoRequirements(String),
}

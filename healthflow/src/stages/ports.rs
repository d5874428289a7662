//! Collaborator ports injected into stages.
//!
//! The pipeline only depends on these contracts. Provider clients, file
//! formats and renderers live behind them and can be swapped freely.

use crate::context::{DateRange, ExtractedRecords, RawPayloads};
use crate::core::{AggregationFamily, CleanRecord, DataType, DayRecord};
use crate::errors::{ExtractionError, FetchError, PersistenceError, RenderError, TransformationError};
use crate::legacy::LegacyTables;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

/// A provider of raw health data.
#[async_trait]
pub trait HealthService: Send + Sync + Debug {
    /// Stable service identifier, e.g. `whoop`.
    fn id(&self) -> &str;

    /// Data kinds this service is asked for.
    fn data_kinds(&self) -> Vec<String>;

    /// Returns true if the service has usable credentials.
    async fn is_authenticated(&self) -> bool;

    /// Fetches one data kind for a date window.
    ///
    /// An array payload is treated as a list of items; anything else is kept
    /// as a single item. `FetchError::Unsupported` means the kind is not
    /// available from this service and is not counted as a failure.
    async fn fetch(&self, kind: &str, window: DateRange) -> Result<Value, FetchError>;
}

/// Splits one service's raw payloads into per-type record lists.
pub trait Extractor: Send + Sync + Debug {
    /// Extracts records keyed by data type identifier.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError` if the payload does not have the expected shape.
    fn extract(&self, raw: &RawPayloads) -> Result<ExtractedRecords, ExtractionError>;
}

/// Result of transforming one record list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transformed {
    /// Canonical records that passed validation.
    pub records: Vec<CleanRecord>,
    /// One reason per record that was filtered out.
    pub filtered: Vec<String>,
}

/// Coerces extracted records of one data type into canonical records.
pub trait Transformer: Send + Sync + Debug {
    /// The canonical type this transformer produces.
    fn data_type(&self) -> DataType;

    /// Transforms a record list.
    ///
    /// # Errors
    ///
    /// Returns `TransformationError` if a record cannot be coerced at all.
    fn transform(&self, records: &[Value]) -> Result<Transformed, TransformationError>;
}

/// Stores pipeline artifacts and returns their location.
///
/// Stages treat every call as best effort: a failure becomes a warning.
#[cfg_attr(test, mockall::automock)]
pub trait Persistence: Send + Sync {
    /// Stores a service's raw payloads.
    fn save_raw(
        &self,
        service: &str,
        payload: &RawPayloads,
        timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError>;

    /// Stores one extracted record list.
    fn save_extracted(
        &self,
        service: &str,
        data_type: &str,
        records: &[Value],
        timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError>;

    /// Stores one canonical record list.
    fn save_transformed(
        &self,
        service: &str,
        data_type: DataType,
        records: &[CleanRecord],
        timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError>;

    /// Stores one family's daily records.
    fn save_aggregated(
        &self,
        family: AggregationFamily,
        records: &[DayRecord],
        timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError>;

    /// Stores the rendered report.
    fn save_report(
        &self,
        end_date: NaiveDate,
        content: &str,
        timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError>;
}

/// Renders the weekly report from the legacy tables.
pub trait ReportRenderer: Send + Sync + Debug {
    /// Produces the report document.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if the document cannot be produced.
    fn render(&self, tables: &LegacyTables) -> Result<String, RenderError>;
}

/// The collaborators a pipeline run needs, keyed where lookup is by service.
#[derive(Clone)]
pub struct Collaborators {
    /// Services by identifier.
    pub services: BTreeMap<String, Arc<dyn HealthService>>,
    /// Extractors by service identifier.
    pub extractors: BTreeMap<String, Arc<dyn Extractor>>,
    /// Artifact storage.
    pub persistence: Arc<dyn Persistence>,
    /// Report renderer.
    pub renderer: Arc<dyn ReportRenderer>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .field("extractors", &self.extractors.keys().collect::<Vec<_>>())
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Creates a collaborator set with no services or extractors.
    #[must_use]
    pub fn new(persistence: Arc<dyn Persistence>, renderer: Arc<dyn ReportRenderer>) -> Self {
        Self {
            services: BTreeMap::new(),
            extractors: BTreeMap::new(),
            persistence,
            renderer,
        }
    }

    /// Registers a service under its own identifier.
    #[must_use]
    pub fn with_service(mut self, service: Arc<dyn HealthService>) -> Self {
        self.services.insert(service.id().to_string(), service);
        self
    }

    /// Registers an extractor for a service identifier.
    #[must_use]
    pub fn with_extractor(mut self, service: impl Into<String>, extractor: Arc<dyn Extractor>) -> Self {
        self.extractors.insert(service.into(), extractor);
        self
    }

    /// Registers a service together with its extractor.
    #[must_use]
    pub fn with_source(self, service: Arc<dyn HealthService>, extractor: Arc<dyn Extractor>) -> Self {
        let id = service.id().to_string();
        self.with_service(service).with_extractor(id, extractor)
    }
}

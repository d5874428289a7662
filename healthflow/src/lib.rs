//! # Healthflow
//!
//! A staged pipeline turning personal health exports into daily aggregates
//! and a weekly report.
//!
//! A run walks five stages in a fixed order:
//!
//! - **Fetch**: pull raw payloads from each service, one window at a time
//! - **Extract**: split payloads into per-type record lists
//! - **Transform**: coerce and validate canonical records
//! - **Aggregate**: build one record per family per day through the
//!   aggregator registry
//! - **Report**: adapt the aggregates to the legacy tables and render them
//!
//! Failures are isolated per item. A failed service, data type or day turns
//! its stage PARTIAL instead of aborting the run, and a stage that fails
//! outright is recorded while the next stage still runs.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use healthflow::prelude::*;
//!
//! let config = PipelineConfig::new().with_days(8).with_input_dir("exports");
//! let orchestrator = PipelineBuilder::local(&config).build();
//!
//! let outcome = orchestrator.run_config(&config).await;
//! log_pipeline_summary(&outcome);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod aggregation;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod legacy;
pub mod observability;
pub mod persistence;
pub mod pipeline;
pub mod providers;
pub mod report;
pub mod stages;
pub mod testing;
pub mod transform;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::aggregation::{Aggregator, AggregatorRegistry, DayInputs};
    pub use crate::config::{FetchConfig, PipelineConfig};
    pub use crate::context::{DateRange, PipelineContext};
    pub use crate::core::{
        AggregationFamily, CleanRecord, DataType, DayRecord, StageName, StageResult, StageStatus,
    };
    pub use crate::errors::{HealthflowError, StageError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::legacy::{LegacyReportAdapter, LegacyTables};
    pub use crate::observability::{init_tracing, log_pipeline_summary};
    pub use crate::persistence::FilePersistence;
    pub use crate::pipeline::{Orchestrator, PipelineBuilder, PipelineOutcome};
    pub use crate::providers::{LocalExportService, PassthroughExtractor};
    pub use crate::report::MarkdownReportRenderer;
    pub use crate::stages::{
        Collaborators, Extractor, HealthService, Persistence, ReportRenderer, Stage, Transformer,
    };
    pub use crate::transform::TransformerRegistry;
}

//! Pipeline builder.

use super::Orchestrator;
use crate::aggregation::AggregatorRegistry;
use crate::config::{FetchConfig, PipelineConfig};
use crate::core::StageName;
use crate::events::{EventSink, NoOpEventSink};
use crate::persistence::FilePersistence;
use crate::providers::{LocalExportService, PassthroughExtractor};
use crate::report::MarkdownReportRenderer;
use crate::stages::{
    AggregateStage, Collaborators, ExtractStage, FetchStage, ReportStage, Stage, TransformStage,
};
use crate::transform::TransformerRegistry;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Directory under `data_dir` read for local exports when no input
/// directory is configured.
pub const DEFAULT_EXPORTS_DIR: &str = "exports";

/// Builder wiring collaborators and registries into an [`Orchestrator`].
///
/// Stage order is fixed. A replacement stage takes the slot of the built-in
/// stage with the same name.
pub struct PipelineBuilder {
    collaborators: Collaborators,
    transformers: TransformerRegistry,
    aggregators: AggregatorRegistry,
    fetch: FetchConfig,
    include_report: bool,
    event_sink: Arc<dyn EventSink>,
    replacements: BTreeMap<StageName, Arc<dyn Stage>>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("collaborators", &self.collaborators)
            .field("aggregators", &self.aggregators.names())
            .field("fetch", &self.fetch)
            .field("include_report", &self.include_report)
            .field("replacements", &self.replacements.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Creates a builder with the standard registries.
    #[must_use]
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            transformers: TransformerRegistry::standard(),
            aggregators: AggregatorRegistry::standard(),
            fetch: FetchConfig::default(),
            include_report: true,
            event_sink: Arc::new(NoOpEventSink),
            replacements: BTreeMap::new(),
        }
    }

    /// Creates a builder reading local exports and writing under `data_dir`.
    ///
    /// Each configured service reads `{input_dir}/{service}/{kind}.json`.
    #[must_use]
    pub fn local(config: &PipelineConfig) -> Self {
        let input_dir: PathBuf = config
            .input_dir
            .clone()
            .unwrap_or_else(|| config.data_dir.join(DEFAULT_EXPORTS_DIR));

        let collaborators = config.services.iter().fold(
            Collaborators::new(
                Arc::new(FilePersistence::new(config.data_dir.clone())),
                Arc::new(MarkdownReportRenderer::new()),
            ),
            |collaborators, id| {
                collaborators.with_source(
                    Arc::new(LocalExportService::new(&input_dir, id.as_str())),
                    Arc::new(PassthroughExtractor::new()),
                )
            },
        );

        Self::new(collaborators)
            .with_fetch(config.fetch.clone())
            .with_report(config.include_report)
    }

    /// Replaces the transformer registry.
    #[must_use]
    pub fn with_transformers(mut self, transformers: TransformerRegistry) -> Self {
        self.transformers = transformers;
        self
    }

    /// Replaces the aggregator registry.
    #[must_use]
    pub fn with_aggregators(mut self, aggregators: AggregatorRegistry) -> Self {
        self.aggregators = aggregators;
        self
    }

    /// Sets the fetch settings.
    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    /// Sets whether the report stage runs.
    #[must_use]
    pub fn with_report(mut self, include_report: bool) -> Self {
        self.include_report = include_report;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Replaces the built-in stage with the same name.
    #[must_use]
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.replacements.insert(stage.name(), stage);
        self
    }

    /// Builds the orchestrator.
    #[must_use]
    pub fn build(self) -> Orchestrator {
        let Self {
            collaborators,
            transformers,
            aggregators,
            fetch,
            include_report,
            event_sink,
            mut replacements,
        } = self;
        let persistence = collaborators.persistence;

        let mut stages: Vec<Arc<dyn Stage>> = Vec::with_capacity(StageName::ALL.len());
        for name in StageName::ALL {
            if name == StageName::Report && !include_report {
                continue;
            }
            if let Some(stage) = replacements.remove(&name) {
                stages.push(stage);
                continue;
            }
            let stage: Arc<dyn Stage> = match name {
                StageName::Fetch => Arc::new(FetchStage::new(
                    collaborators.services.clone(),
                    Arc::clone(&persistence),
                    fetch.clone(),
                )),
                StageName::Extract => Arc::new(ExtractStage::new(
                    collaborators.extractors.clone(),
                    Arc::clone(&persistence),
                )),
                StageName::Transform => Arc::new(TransformStage::new(
                    transformers.clone(),
                    Arc::clone(&persistence),
                )),
                StageName::Aggregate => Arc::new(AggregateStage::new(
                    Arc::new(aggregators.clone()),
                    Arc::clone(&persistence),
                )),
                StageName::Report => Arc::new(ReportStage::new(
                    Arc::clone(&collaborators.renderer),
                    Arc::clone(&persistence),
                )),
            };
            stages.push(stage);
        }

        Orchestrator::new(stages, event_sink)
    }
}

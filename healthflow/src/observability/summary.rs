//! End-of-run summary.

use crate::pipeline::PipelineOutcome;
use tracing::info;

/// Formats the run summary, one line per entry.
#[must_use]
pub fn summary_lines(outcome: &PipelineOutcome) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Pipeline {} in {:.2}s ({}/{} stages completed, range {})",
            if outcome.success() { "succeeded" } else { "failed" },
            outcome.duration_seconds(),
            outcome.stages_completed(),
            outcome.total_stages(),
            outcome.date_range(),
        ),
    ];

    for result in outcome.stage_results() {
        let mut line = format!(
            "  {} {}: {} ({:.2}s)",
            result.status.symbol(),
            result.stage_name,
            result.status,
            result.duration_seconds
        );
        if let Some(error) = &result.error {
            line.push_str(&format!(" - {error}"));
        }
        if !result.metrics.warnings.is_empty() {
            line.push_str(&format!(" [{} warnings]", result.metrics.warnings.len()));
        }
        lines.push(line);
    }

    for (service, coverage) in outcome.services_processed() {
        let stages: Vec<&str> = [
            ("raw", coverage.raw),
            ("extracted", coverage.extracted),
            ("transformed", coverage.transformed),
        ]
        .into_iter()
        .filter_map(|(label, present)| present.then_some(label))
        .collect();
        let stages = if stages.is_empty() {
            "no data".to_string()
        } else {
            stages.join(", ")
        };
        lines.push(format!("  service {service}: {stages}"));
    }

    for (label, path) in outcome.file_paths() {
        lines.push(format!("  file {label}: {}", path.display()));
    }

    lines
}

/// Logs the run summary at info level.
pub fn log_pipeline_summary(outcome: &PipelineOutcome) {
    for line in summary_lines(outcome) {
        info!(run_id = %outcome.run_id(), "{}", line);
    }
}

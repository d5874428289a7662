//! Observability: subscriber setup and the end-of-run summary.
//!
//! Stages log through `tracing` directly. This module only decides where the
//! events go and how a finished run is reported.

mod subscriber;
mod summary;

pub use subscriber::{filter_directive, init_tracing, LOG_ENV_VAR};
pub use summary::{log_pipeline_summary, summary_lines};

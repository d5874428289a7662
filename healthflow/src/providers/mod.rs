//! Built-in collaborators that need no network access.

mod local_export;
mod passthrough;

pub use local_export::LocalExportService;
pub use passthrough::PassthroughExtractor;

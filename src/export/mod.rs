pub mod pipeline;

pub use pipeline::{ExportPipeline, ExportSummary};

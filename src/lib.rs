pub mod config;
pub mod error;
pub mod models;
pub mod circleci;
pub mod athenian;
pub mod export;

#[cfg(test)]
mod test_support;

pub use config::{Config, ExportConfig};
pub use error::{Error, Result};
pub use circleci::{CircleClient, ReleaseCollector};
pub use athenian::{AthenianClient, BatchRelay, DryRunSink, ReleaseSink};
pub use export::{ExportPipeline, ExportSummary};

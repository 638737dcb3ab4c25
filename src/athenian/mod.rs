pub mod sink;
pub mod client;
pub mod dry_run;
pub mod relay;

pub use sink::ReleaseSink;
pub use client::AthenianClient;
pub use dry_run::DryRunSink;
pub use relay::{BatchRelay, DroppedBatch};

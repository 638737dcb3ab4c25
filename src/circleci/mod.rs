pub mod client;
pub mod rate_limiter;
pub mod paginator;

pub use client::{CircleClient, SourceApi, SourceResponse};
pub use rate_limiter::{Fetched, RateLimitedRequester};
pub use paginator::{Collection, ReleaseCollector, StopReason};

use thiserror::Error;

use crate::athenian::relay::DroppedBatch;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Failed to decode pipeline page for {repository}: {reason}")]
    Decode { repository: String, reason: String },

    #[error("Invalid datetime format: {0}")]
    Timestamp(String),

    #[error("Gave up on {endpoint} after {attempts} attempts")]
    RetriesExhausted { endpoint: String, attempts: u32 },

    #[error("Rate limit did not recover within {0:?} for {1}")]
    ThrottleTimeout(std::time::Duration, String),

    #[error("Athenian API returned {status}: {body}")]
    SinkRejected { status: u16, body: String },

    #[error("{} batches could not be delivered: {}", .0.len(), DroppedBatch::describe_all(.0))]
    BatchesDropped(Vec<DroppedBatch>),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Errors the requester may recover from by issuing the same request again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Io(_))
    }
}

use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use tokio::time::{sleep, Duration};

use crate::athenian::sink::ReleaseSink;
use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::models::Release;

const BACKOFF_BASE_MS: u64 = 1_000;
const BACKOFF_MAX_MS: u64 = 30_000;

/// A batch that was still failing after every delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedBatch {
    pub index: usize,
    pub size: usize,
    pub error: String,
}

impl DroppedBatch {
    pub fn describe_all(batches: &[DroppedBatch]) -> String {
        batches
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for DroppedBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch #{} ({} releases): {}",
            self.index, self.size, self.error
        )
    }
}

/// Splits releases into fixed-size batches and hands each one to a sink.
///
/// Every batch, including the last partial one, gets the same bounded number
/// of attempts with exponential backoff in between. Batches that never make it
/// are reported together once the whole sequence has been attempted.
pub struct BatchRelay<'a> {
    sink: &'a dyn ReleaseSink,
    batch_size: usize,
    delivery_attempts: u32,
}

impl<'a> BatchRelay<'a> {
    pub fn new(sink: &'a dyn ReleaseSink, config: &ExportConfig) -> Self {
        Self {
            sink,
            batch_size: config.batch_size.max(1),
            delivery_attempts: config.delivery_attempts.max(1),
        }
    }

    /// Delivers all releases, returning how many were accepted.
    pub async fn relay(&self, releases: &[Release]) -> Result<usize> {
        let pb = ProgressBar::new(releases.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} releases")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut delivered = 0;
        let mut dropped = Vec::new();

        for (index, batch) in releases.chunks(self.batch_size).enumerate() {
            match self.deliver(index, batch).await {
                Ok(()) => {
                    delivered += batch.len();
                    pb.inc(batch.len() as u64);
                }
                Err(e) => {
                    tracing::error!(
                        "Dropping batch #{} of {} releases after {} attempts: {}",
                        index,
                        batch.len(),
                        self.delivery_attempts,
                        e
                    );
                    dropped.push(DroppedBatch {
                        index,
                        size: batch.len(),
                        error: e.to_string(),
                    });
                }
            }
        }

        pb.finish_and_clear();

        if dropped.is_empty() {
            Ok(delivered)
        } else {
            Err(Error::BatchesDropped(dropped))
        }
    }

    async fn deliver(&self, index: usize, batch: &[Release]) -> Result<()> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.sink.submit(batch).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.delivery_attempts => {
                    let delay = delivery_backoff(attempt);
                    tracing::warn!(
                        "[{}/{}] failed to deliver batch #{}, retrying in {:?}: {}",
                        attempt,
                        self.delivery_attempts,
                        index,
                        delay,
                        e
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn delivery_backoff(attempt: u32) -> Duration {
    let delay_ms = BACKOFF_BASE_MS.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    Duration::from_millis(delay_ms.min(BACKOFF_MAX_MS))
}

use chrono::{DateTime, Utc};

use crate::athenian::{BatchRelay, DroppedBatch, ReleaseSink};
use crate::circleci::{ReleaseCollector, SourceApi};
use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::models::{Release, RepoTarget};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub collected: usize,
    pub delivered: usize,
    pub failed_repositories: Vec<String>,
    pub dropped_batches: Vec<DroppedBatch>,
}

impl ExportSummary {
    /// Turns undelivered batches into an error once the summary has been reported.
    pub fn into_result(self) -> Result<Self> {
        if self.dropped_batches.is_empty() {
            Ok(self)
        } else {
            Err(Error::BatchesDropped(self.dropped_batches))
        }
    }
}

/// Loads the pipelines of every target, one repository after another, and
/// only then relays the accumulated releases.
pub struct ExportPipeline<'a> {
    source: &'a dyn SourceApi,
    sink: &'a dyn ReleaseSink,
    config: ExportConfig,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(source: &'a dyn SourceApi, sink: &'a dyn ReleaseSink, config: ExportConfig) -> Self {
        Self {
            source,
            sink,
            config,
        }
    }

    pub async fn run(&self, targets: &[RepoTarget], since: DateTime<Utc>) -> Result<ExportSummary> {
        tracing::info!("Loading the pipelines for {} repositories", targets.len());
        let (releases, failed_repositories) = self.collect_all(targets, since).await;

        tracing::info!("Sending {} release notifications to Athenian", releases.len());
        let (delivered, dropped_batches) = match BatchRelay::new(self.sink, &self.config)
            .relay(&releases)
            .await
        {
            Ok(delivered) => (delivered, Vec::new()),
            Err(Error::BatchesDropped(dropped)) => {
                let lost: usize = dropped.iter().map(|batch| batch.size).sum();
                (releases.len() - lost, dropped)
            }
            Err(e) => return Err(e),
        };

        Ok(ExportSummary {
            collected: releases.len(),
            delivered,
            failed_repositories,
            dropped_batches,
        })
    }

    async fn collect_all(
        &self,
        targets: &[RepoTarget],
        since: DateTime<Utc>,
    ) -> (Vec<Release>, Vec<String>) {
        let collector = ReleaseCollector::new(self.source, &self.config);
        let mut releases = Vec::new();
        let mut failed = Vec::new();

        for target in targets {
            match collector.collect(target, since).await {
                Ok(collection) => {
                    tracing::info!(
                        "Loaded {} releases from {} ({:?})",
                        collection.releases.len(),
                        target,
                        collection.stop
                    );
                    releases.extend(collection.releases);
                }
                Err(e) => {
                    tracing::error!("Failed to load pipelines for {}: {}", target, e);
                    failed.push(target.to_string());
                }
            }
        }

        (releases, failed)
    }
}

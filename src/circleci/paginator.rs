use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::circleci::client::SourceApi;
use crate::circleci::rate_limiter::RateLimitedRequester;
use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::models::{parse_created_at, PipelinePage, Release, RepoTarget};

/// Why a collection stopped requesting pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The last pipeline on a page predates the cutoff.
    CutoffReached,
    /// The API returned no cursor for a further page.
    CursorExhausted,
    /// A page came back without any pipelines.
    EmptyPage,
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub releases: Vec<Release>,
    pub stop: StopReason,
}

/// Walks the pipeline history of a project newest-first and turns every
/// pipeline created at or after the cutoff into a [`Release`].
pub struct ReleaseCollector<'a> {
    requester: RateLimitedRequester<'a>,
}

impl<'a> ReleaseCollector<'a> {
    pub fn new(api: &'a dyn SourceApi, config: &ExportConfig) -> Self {
        Self {
            requester: RateLimitedRequester::new(api, config),
        }
    }

    /// Collects releases for `target`.
    ///
    /// Any failure (exhausted retries, an undecodable page, a bad timestamp)
    /// discards what was gathered so far for this repository.
    pub async fn collect(&self, target: &RepoTarget, since: DateTime<Utc>) -> Result<Collection> {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {prefix} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_prefix(target.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        self.collect_with_progress(target, since, &pb).await
    }

    /// The spinner is cleared whether or not the walk succeeds.
    async fn collect_with_progress(
        &self,
        target: &RepoTarget,
        since: DateTime<Utc>,
        pb: &ProgressBar,
    ) -> Result<Collection> {
        let result = self.walk(target, since, pb).await;
        pb.finish_and_clear();
        result
    }

    async fn walk(
        &self,
        target: &RepoTarget,
        since: DateTime<Utc>,
        pb: &ProgressBar,
    ) -> Result<Collection> {
        let mut releases = Vec::new();
        let mut cursor: Option<String> = None;
        let mut last_created_at = since;

        let stop = loop {
            let endpoint =
                pipeline_endpoint(&target.repository, target.branch.as_deref(), cursor.as_deref());
            let fetched = self.requester.fetch(&endpoint).await?;

            pb.set_message(format!(
                "Loaded {} pipelines since {} [rate limit {}]",
                releases.len(),
                last_created_at.format("%Y-%m-%d"),
                fetched.remaining
            ));

            let page: PipelinePage =
                serde_json::from_str(&fetched.body).map_err(|e| Error::Decode {
                    repository: target.repository.clone(),
                    reason: e.to_string(),
                })?;

            if page.items.is_empty() {
                break StopReason::EmptyPage;
            }

            for pipeline in &page.items {
                let created_at = parse_created_at(&pipeline.created_at)?;
                last_created_at = created_at;

                if created_at < since {
                    continue;
                }
                if pipeline.vcs.revision.is_empty() {
                    tracing::warn!(
                        "Skipping pipeline created at {} in {}: no revision",
                        pipeline.created_at,
                        target.repository
                    );
                    continue;
                }

                releases.push(Release::new(
                    created_at,
                    &pipeline.trigger.actor.login,
                    &pipeline.vcs.revision,
                    &target.repository,
                ));
            }

            if last_created_at < since {
                break StopReason::CutoffReached;
            }

            match page.next_cursor() {
                Some(next) if cursor.as_deref() == Some(next) => {
                    tracing::warn!("CircleCI returned the same page token twice for {}", target);
                    break StopReason::CursorExhausted;
                }
                Some(next) => cursor = Some(next.to_string()),
                None => break StopReason::CursorExhausted,
            }
        };

        tracing::debug!(
            "Collected {} releases for {} ({:?})",
            releases.len(),
            target,
            stop
        );

        Ok(Collection { releases, stop })
    }
}

/// Builds `project/gh/{repo}/pipeline[?branch=..][&page-token=..]` with
/// percent-encoded query values.
pub fn pipeline_endpoint(repository: &str, branch: Option<&str>, page_token: Option<&str>) -> String {
    let query: Vec<String> = [("branch", branch), ("page-token", page_token)]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}={}", key, urlencoding::encode(v)))
        })
        .collect();

    if query.is_empty() {
        format!("project/gh/{}/pipeline", repository)
    } else {
        format!("project/gh/{}/pipeline?{}", repository, query.join("&"))
    }
}

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

/// Host prefix used to namespace authors and repositories.
pub const VCS_HOST: &str = "github.com";

const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
const SHORT_REVISION_LEN: usize = 7;

/// A release event derived from one pipeline execution.
///
/// Fields are only readable after construction; `name` is always derived from
/// `published_at` and `commit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    published_at: DateTime<Utc>,
    author: String,
    commit: String,
    repository: String,
    name: String,
}

impl Release {
    pub fn new(published_at: DateTime<Utc>, login: &str, commit: &str, repository: &str) -> Self {
        Self {
            published_at,
            author: format!("{}/{}", VCS_HOST, login),
            commit: commit.to_string(),
            repository: format!("{}/{}", VCS_HOST, repository),
            name: release_name(published_at, commit),
        }
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// `YYYY-MM-DD-<first 7 chars of the revision>`.
pub fn release_name(published_at: DateTime<Utc>, commit: &str) -> String {
    let short = commit
        .char_indices()
        .nth(SHORT_REVISION_LEN)
        .map(|(end, _)| &commit[..end])
        .unwrap_or(commit);
    format!("{}-{}", published_at.format("%Y-%m-%d"), short)
}

/// Parses a pipeline `created_at` value (`YYYY-MM-DDThh:mm:ssZ`, fractional
/// seconds tolerated).
pub fn parse_created_at(value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, CREATED_AT_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::Timestamp(value.to_string()))
}

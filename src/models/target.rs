use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A repository to export, optionally restricted to one branch.
///
/// Parsed from `owner/repo` or `owner/repo@branch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub repository: String,
    pub branch: Option<String>,
}

impl FromStr for RepoTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('-') {
            return Err(Error::Config(format!(
                "\"{}\" is not a repository name, flags must go first",
                s
            )));
        }

        let (repository, branch) = match s.split_once('@') {
            Some((repository, branch)) => (repository, Some(branch)),
            None => (s, None),
        };

        let mut parts = repository.split('/');
        let valid = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
        );
        if !valid {
            return Err(Error::Config(format!(
                "\"{}\" is not a repository name, expected owner/repo[@branch]",
                s
            )));
        }

        Ok(Self {
            repository: repository.to_string(),
            branch: branch.filter(|b| !b.is_empty()).map(str::to_string),
        })
    }
}

impl fmt::Display for RepoTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.branch {
            Some(branch) => write!(f, "{}@{}", self.repository, branch),
            None => write!(f, "{}", self.repository),
        }
    }
}

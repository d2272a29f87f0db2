//! Upstream pull request source
//!
//! The pipeline only talks to the hosting platform through
//! [`PullRequestSource`], so the batch processor can be driven by an in-memory
//! source in tests and by [`GitHubClient`] in production.

mod github;
mod models;

pub use github::{GitHubClient, IssueComment};

use crate::types::{PullRequest, RepoSlug};
use async_trait::async_trait;
use serde::Deserialize;
use strum_macros::{Display, EnumString};

/// Errors returned by a pull request source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("GraphQL query failed: {0}")]
    GraphQl(String),
    #[error("Response is missing {0}")]
    MissingData(String),
    #[error("Unexpected comparison status '{0}'")]
    UnknownComparison(String),
}

/// Authenticated user, used to greet at startup
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub login: String,
    pub name: Option<String>,
}

impl Viewer {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.login)
    }
}

/// A tagged release of a repository
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub tag_name: String,
    /// Branch or commit the tag was created from
    pub target_commitish: String,
}

/// How `head` relates to `base` in a commit comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ComparisonStatus {
    Ahead,
    Behind,
    Identical,
    Diverged,
}

/// A search over one repository's pull requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub repo: RepoSlug,
    /// Search qualifiers, without the `repo:` qualifier
    pub qualifiers: String,
}

impl SearchQuery {
    pub fn new(repo: RepoSlug, qualifiers: impl Into<String>) -> Self {
        Self {
            repo,
            qualifiers: qualifiers.into(),
        }
    }

    /// The full search string sent to the API
    pub fn to_query_string(&self) -> String {
        format!("repo:{} {}", self.repo, self.qualifiers.trim())
    }
}

#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// The user the credentials belong to
    async fn viewer(&self) -> Result<Viewer, SourceError>;

    /// All pull requests matching a search, across every result page
    async fn search_pull_requests(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<PullRequest>, SourceError>;

    async fn pull_request(&self, repo: &RepoSlug, number: u64)
    -> Result<PullRequest, SourceError>;

    async fn latest_release(&self, repo: &RepoSlug) -> Result<Release, SourceError>;

    async fn release_by_tag(&self, repo: &RepoSlug, tag: &str) -> Result<Release, SourceError>;

    /// Status of `head` relative to `base`
    async fn compare_commits(
        &self,
        repo: &RepoSlug,
        base: &str,
        head: &str,
    ) -> Result<ComparisonStatus, SourceError>;
}

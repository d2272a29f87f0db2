//! Pull request records as consumed by the changelog pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single labeled event from a pull request's timeline
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LabelEvent {
    /// Name of the label that was applied
    pub label: String,
    /// When the label was applied
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state reported by the hosting platform
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestState {
    #[default]
    Open,
    Closed,
    Merged,
}

/// A merged pull request fetched from one of the tracked repositories
///
/// Records are read-only once fetched: the pipeline never edits a PR, it only
/// decides whether (and where) to file it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub url: String,
    #[serde(default)]
    pub state: PullRequestState,
    #[serde(default)]
    pub is_draft: bool,
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Login of the author, absent for deleted accounts
    pub author: Option<String>,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Logins of the people assigned to the PR
    #[serde(default)]
    pub assignees: Vec<String>,
    pub merged_at: Option<DateTime<Utc>>,
    /// Object id of the merge commit
    pub merge_commit: Option<String>,
    /// Labeled events in chronological order
    #[serde(default)]
    pub label_events: Vec<LabelEvent>,
}

impl PullRequest {
    /// Whether the PR carries the given label
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Timestamp of the most recent time `label` was applied
    ///
    /// Labels can be removed and re-applied (e.g. a rollback followed by a
    /// redeploy), so only the latest event counts.
    pub fn last_labeled_at(&self, label: &str) -> Option<DateTime<Utc>> {
        self.label_events
            .iter()
            .rev()
            .find(|event| event.label == label)
            .map(|event| event.created_at)
    }
}

/// `owner/name` identifier of a hosted repository
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct RepoSlug {
    owner: String,
    name: String,
}

impl RepoSlug {
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::str::FromStr for RepoSlug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(format!("Invalid repository '{s}', expected 'owner/name'")),
        }
    }
}

impl TryFrom<String> for RepoSlug {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepoSlug> for String {
    fn from(slug: RepoSlug) -> Self {
        slug.to_string()
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

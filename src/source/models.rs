//! Wire shapes of the GitHub GraphQL and REST responses we consume

use crate::types::{LabelEvent, PullRequest, PullRequestState};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Fields selected for every pull request, shared by search and lookup queries
pub(super) const PULL_REQUEST_FIELDS: &str = r"
    number
    url
    title
    body
    state
    isDraft
    author { login }
    participants(first: 20) { nodes { login } }
    labels(first: 50) { nodes { name } }
    assignees(first: 20) { nodes { login } }
    mergedAt
    mergeCommit { oid }
    timelineItems(last: 100, itemTypes: [LABELED_EVENT]) {
      nodes {
        ... on LabeledEvent {
          createdAt
          label { name }
        }
      }
    }
";

#[derive(Deserialize, Debug)]
pub(super) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Deserialize, Debug)]
pub(super) struct GraphQlError {
    pub message: String,
}

#[derive(Deserialize, Debug)]
pub(super) struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

#[derive(Deserialize, Debug)]
pub(super) struct Actor {
    pub login: String,
}

#[derive(Deserialize, Debug)]
pub(super) struct LabelNode {
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub(super) struct CommitNode {
    pub oid: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct LabeledEventNode {
    pub created_at: Option<DateTime<Utc>>,
    pub label: Option<LabelNode>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct PullRequestNode {
    pub number: u64,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub state: PullRequestState,
    #[serde(default)]
    pub is_draft: bool,
    pub author: Option<Actor>,
    #[serde(default)]
    pub participants: Connection<Actor>,
    #[serde(default)]
    pub labels: Connection<LabelNode>,
    #[serde(default)]
    pub assignees: Connection<Actor>,
    pub merged_at: Option<DateTime<Utc>>,
    pub merge_commit: Option<CommitNode>,
    #[serde(default)]
    pub timeline_items: Connection<LabeledEventNode>,
}

impl From<PullRequestNode> for PullRequest {
    fn from(node: PullRequestNode) -> Self {
        Self {
            number: node.number,
            url: node.url,
            title: node.title,
            body: node.body,
            state: node.state,
            is_draft: node.is_draft,
            author: node.author.map(|actor| actor.login),
            participants: node
                .participants
                .nodes
                .into_iter()
                .map(|actor| actor.login)
                .collect(),
            labels: node.labels.nodes.into_iter().map(|l| l.name).collect(),
            assignees: node
                .assignees
                .nodes
                .into_iter()
                .map(|actor| actor.login)
                .collect(),
            merged_at: node.merged_at,
            merge_commit: node.merge_commit.map(|commit| commit.oid),
            label_events: node
                .timeline_items
                .nodes
                .into_iter()
                .filter_map(|event| {
                    Some(LabelEvent {
                        label: event.label?.name,
                        created_at: event.created_at?,
                    })
                })
                .collect(),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchConnection {
    #[serde(default)]
    pub nodes: Vec<PullRequestNode>,
    pub page_info: PageInfo,
}

#[derive(Deserialize, Debug)]
pub(super) struct SearchData {
    pub search: SearchConnection,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct RepositoryData {
    pub repository: Option<RepositoryNode>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct RepositoryNode {
    pub pull_request: Option<PullRequestNode>,
}

#[derive(Deserialize, Debug)]
pub(super) struct ViewerData {
    pub viewer: super::Viewer,
}

#[derive(Deserialize, Debug)]
pub(super) struct CompareResponse {
    pub status: String,
}

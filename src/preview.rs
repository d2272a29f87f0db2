//! Preview comment showing how a single PR will appear in the changelog

use crate::changes::{InclusionPolicy, describe_match, extract, format_pr_line};
use crate::log_info;
use crate::source::{GitHubClient, IssueComment, SourceError};
use crate::types::{CategoryForest, PullRequest, PullRequestState, RepoSlug};
use async_trait::async_trait;
use std::fmt::Write;

/// First line of every preview comment, used to find it again
pub const COMMENT_MARKER: &str = "<!--- AUTOMATIC_RELEASE_NOTE_COMMENT -->";

/// Whether the PR will make it into the next changelog
pub fn inclusion_status(pr: &PullRequest, policy: Option<&InclusionPolicy>) -> &'static str {
    match (pr.state, policy) {
        (PullRequestState::Closed, _) => {
            "Not included in the next changelog (closed without merge)"
        }
        (PullRequestState::Open, _) if pr.is_draft => {
            "Not yet included in the next changelog, because this PR is a draft"
        }
        (PullRequestState::Open, Some(InclusionPolicy::Deployed { .. })) => {
            "May be included in the next changelog (waiting for merge + deploy)"
        }
        (PullRequestState::Open, _) => "May be included in the next changelog (waiting for merge)",
        (PullRequestState::Merged, Some(InclusionPolicy::Deployed { label, .. }))
            if !pr.has_label(label) =>
        {
            "Not yet included in the next changelog (merged but not deployed)"
        }
        (PullRequestState::Merged, Some(InclusionPolicy::Released)) => {
            "Included in the changelog once it ships in a release"
        }
        (PullRequestState::Merged, _) => "Included in the next changelog",
    }
}

/// `@login` mentions of the assignees, or of the author when nobody is assigned
fn responsible(pr: &PullRequest) -> Vec<String> {
    if pr.assignees.is_empty() {
        pr.author.iter().map(|author| format!("@{author}")).collect()
    } else {
        pr.assignees.iter().map(|login| format!("@{login}")).collect()
    }
}

fn label_url(repo: &RepoSlug, label: &str) -> String {
    let mut url = format!("https://github.com/{}/{}/labels/", repo.owner(), repo.name());
    url.extend(url::form_urlencoded::byte_serialize(label.as_bytes()));
    // form encoding turns spaces into '+', label URLs need %20
    url.replace('+', "%20")
}

/// Render the preview comment, `None` when the PR has no release note
pub fn render_comment(
    pr: &PullRequest,
    repo: &RepoSlug,
    forest: &CategoryForest,
    policy: Option<&InclusionPolicy>,
    excluded_users: &[String],
) -> Option<String> {
    let note = extract(pr)?;
    let line = format_pr_line(pr, excluded_users);

    let mut comment = format!("{COMMENT_MARKER}\n## Changelog entry\n");
    let mentions = responsible(pr);
    if !mentions.is_empty() {
        writeln!(
            comment,
            "This is a preview of how the changelog script interpreted your PR, {}:",
            mentions.join(", ")
        )
        .expect("write to string should not fail");
    }
    writeln!(comment, "### Status\n{}", inclusion_status(pr, policy))
        .expect("write to string should not fail");
    write!(comment, "### Release Note(s)\n{line}\n").expect("write to string should not fail");
    comment.push_str("### Category\n");

    match describe_match(pr, &note, forest) {
        Some(categories) => {
            let category = categories.join(", ");
            let category_labels = forest.all_labels();
            let contributing: Vec<String> = pr
                .labels
                .iter()
                .filter(|label| category_labels.contains(&label.as_str()))
                .map(|label| label_url(repo, label))
                .collect();
            let basis = if contributing.is_empty() {
                "the PR title prefix".to_string()
            } else {
                contributing.join(", ")
            };
            write!(
                comment,
                "{category}\n\nWe have automatically detected this PR as belonging to the `{category}` category (based on {basis}). If you feel this is incorrect, please check the changelog category configuration for the available categories and the labels and PR title prefixes used to pick them."
            )
            .expect("write to string should not fail");
        }
        None => comment.push_str(
            "⚠️ We have not been able to automatically detect a category for this PR. Please check the changelog category configuration for all available categories along with the labels you can use with them. If this PR is left un-categorized, it will be included in the catch-all category at the end of the changelog.",
        ),
    }

    Some(comment)
}

/// Comment operations on a pull request's conversation
#[async_trait]
pub trait IssueComments: Send + Sync {
    async fn list_comments(
        &self,
        repo: &RepoSlug,
        number: u64,
    ) -> Result<Vec<IssueComment>, SourceError>;

    async fn create_comment(
        &self,
        repo: &RepoSlug,
        number: u64,
        body: &str,
    ) -> Result<(), SourceError>;

    async fn update_comment(
        &self,
        repo: &RepoSlug,
        comment_id: u64,
        body: &str,
    ) -> Result<(), SourceError>;

    async fn delete_comment(&self, repo: &RepoSlug, comment_id: u64) -> Result<(), SourceError>;
}

#[async_trait]
impl IssueComments for GitHubClient {
    async fn list_comments(
        &self,
        repo: &RepoSlug,
        number: u64,
    ) -> Result<Vec<IssueComment>, SourceError> {
        self.list_issue_comments(repo, number).await
    }

    async fn create_comment(
        &self,
        repo: &RepoSlug,
        number: u64,
        body: &str,
    ) -> Result<(), SourceError> {
        self.create_issue_comment(repo, number, body).await.map(drop)
    }

    async fn update_comment(
        &self,
        repo: &RepoSlug,
        comment_id: u64,
        body: &str,
    ) -> Result<(), SourceError> {
        self.update_issue_comment(repo, comment_id, body)
            .await
            .map(drop)
    }

    async fn delete_comment(&self, repo: &RepoSlug, comment_id: u64) -> Result<(), SourceError> {
        self.delete_issue_comment(repo, comment_id).await
    }
}

/// What [`upsert_comment`] or [`remove_comment`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAction {
    Created,
    Updated,
    Unchanged,
    Deleted,
}

async fn find_preview(
    comments: &dyn IssueComments,
    repo: &RepoSlug,
    number: u64,
) -> Result<Option<IssueComment>, SourceError> {
    Ok(comments
        .list_comments(repo, number)
        .await?
        .into_iter()
        .find(|comment| comment.body.starts_with(COMMENT_MARKER)))
}

/// Update the existing preview comment on a PR, or create one
pub async fn upsert_comment(
    comments: &dyn IssueComments,
    repo: &RepoSlug,
    number: u64,
    body: &str,
) -> Result<CommentAction, SourceError> {
    match find_preview(comments, repo, number).await? {
        Some(comment) if comment.body == body => Ok(CommentAction::Unchanged),
        Some(comment) => {
            log_info!("Updating preview comment {} on {}#{}", comment.id, repo, number);
            comments.update_comment(repo, comment.id, body).await?;
            Ok(CommentAction::Updated)
        }
        None => {
            log_info!("Creating preview comment on {}#{}", repo, number);
            comments.create_comment(repo, number, body).await?;
            Ok(CommentAction::Created)
        }
    }
}

/// Delete a stale preview comment, e.g. after the release note was removed
pub async fn remove_comment(
    comments: &dyn IssueComments,
    repo: &RepoSlug,
    number: u64,
) -> Result<CommentAction, SourceError> {
    match find_preview(comments, repo, number).await? {
        Some(comment) => {
            log_info!("Deleting preview comment {} on {}#{}", comment.id, repo, number);
            comments.delete_comment(repo, comment.id).await?;
            Ok(CommentAction::Deleted)
        }
        None => Ok(CommentAction::Unchanged),
    }
}

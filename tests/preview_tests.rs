#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use docs_changelog::changes::InclusionPolicy;
use docs_changelog::preview::{
    COMMENT_MARKER, CommentAction, IssueComments, inclusion_status, remove_comment,
    render_comment, upsert_comment,
};
use docs_changelog::source::{IssueComment, SourceError};
use docs_changelog::types::RepoSlug;
use parking_lot::Mutex;

use test_utils::{PrBuilder, at, default_forest, slug};

/// In-memory comment thread of a single PR
#[derive(Default)]
struct FakeComments {
    comments: Mutex<Vec<IssueComment>>,
}

impl FakeComments {
    fn with_comment(self, id: u64, body: &str) -> Self {
        self.comments.lock().push(IssueComment {
            id,
            body: body.to_string(),
        });
        self
    }

    fn bodies(&self) -> Vec<String> {
        self.comments.lock().iter().map(|c| c.body.clone()).collect()
    }
}

#[async_trait]
impl IssueComments for FakeComments {
    async fn list_comments(
        &self,
        _repo: &RepoSlug,
        _number: u64,
    ) -> Result<Vec<IssueComment>, SourceError> {
        Ok(self.comments.lock().clone())
    }

    async fn create_comment(
        &self,
        _repo: &RepoSlug,
        _number: u64,
        body: &str,
    ) -> Result<(), SourceError> {
        let mut comments = self.comments.lock();
        let id = comments.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        comments.push(IssueComment {
            id,
            body: body.to_string(),
        });
        Ok(())
    }

    async fn update_comment(
        &self,
        _repo: &RepoSlug,
        comment_id: u64,
        body: &str,
    ) -> Result<(), SourceError> {
        let mut comments = self.comments.lock();
        let comment = comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| SourceError::MissingData(format!("comment {comment_id}")))?;
        comment.body = body.to_string();
        Ok(())
    }

    async fn delete_comment(&self, _repo: &RepoSlug, comment_id: u64) -> Result<(), SourceError> {
        self.comments.lock().retain(|c| c.id != comment_id);
        Ok(())
    }
}

fn deployed() -> InclusionPolicy {
    InclusionPolicy::Deployed {
        label: "deployed".to_string(),
        lookback_days: 60,
        extra_qualifiers: String::new(),
    }
}

fn excluded() -> Vec<String> {
    vec!["roboquat".to_string()]
}

#[test]
fn test_inclusion_status() {
    let open = PrBuilder::new(1, "Open").build();
    let merged = PrBuilder::new(2, "Merged").merged_at(at(2022, 10, 5, 9)).build();
    let deployed_pr = PrBuilder::new(3, "Deployed")
        .labels(&["deployed"])
        .merged_at(at(2022, 10, 5, 9))
        .build();

    assert_eq!(
        inclusion_status(&open, Some(&deployed())),
        "May be included in the next changelog (waiting for merge + deploy)"
    );
    assert_eq!(
        inclusion_status(&merged, Some(&deployed())),
        "Not yet included in the next changelog (merged but not deployed)"
    );
    assert_eq!(
        inclusion_status(&deployed_pr, Some(&deployed())),
        "Included in the next changelog"
    );
    assert_eq!(
        inclusion_status(&open, Some(&InclusionPolicy::Merged)),
        "May be included in the next changelog (waiting for merge)"
    );
    assert_eq!(inclusion_status(&merged, None), "Included in the next changelog");
    assert_eq!(
        inclusion_status(&merged, Some(&InclusionPolicy::Released)),
        "Included in the changelog once it ships in a release"
    );
}

#[test]
fn test_closed_and_draft_status() {
    let closed = PrBuilder::new(4, "Abandoned").closed().build();
    let draft = PrBuilder::new(5, "Work in progress").draft().build();

    for policy in [None, Some(deployed()), Some(InclusionPolicy::Merged)] {
        assert_eq!(
            inclusion_status(&closed, policy.as_ref()),
            "Not included in the next changelog (closed without merge)"
        );
        assert_eq!(
            inclusion_status(&draft, policy.as_ref()),
            "Not yet included in the next changelog, because this PR is a draft"
        );
    }
}

#[test]
fn test_closed_pr_comment_does_not_promise_inclusion() {
    let pr = PrBuilder::new(9, "[code] Abandoned idea")
        .note("Abandoned idea")
        .closed()
        .build();
    let comment = render_comment(
        &pr,
        &slug("gitpod-io/gitpod"),
        &default_forest(),
        Some(&deployed()),
        &excluded(),
    )
    .unwrap();
    assert!(comment.contains("### Status\nNot included in the next changelog (closed without merge)\n"));
    assert!(!comment.contains("May be included"));
}

#[test]
fn test_comment_greets_assignees() {
    let pr = PrBuilder::new(10, "Docs")
        .author("alice")
        .assignees(&["bob", "carol"])
        .note("Docs")
        .build();
    let comment =
        render_comment(&pr, &slug("gitpod-io/gitpod"), &default_forest(), None, &excluded())
            .unwrap();
    assert!(comment.contains("interpreted your PR, @bob, @carol:\n"));
    assert!(!comment.contains("@alice"));
}

#[test]
fn test_comment_greets_author_without_assignees() {
    let pr = PrBuilder::new(11, "Docs").author("dave").note("Docs").build();
    let comment =
        render_comment(&pr, &slug("gitpod-io/gitpod"), &default_forest(), None, &excluded())
            .unwrap();
    assert!(comment.contains("interpreted your PR, @dave:\n"));
}

#[tokio::test]
async fn test_upsert_creates_then_updates() {
    let repo = slug("gitpod-io/gitpod");
    let comments = FakeComments::default().with_comment(1, "LGTM");
    let first = format!("{COMMENT_MARKER}\nfirst");
    let second = format!("{COMMENT_MARKER}\nsecond");

    assert_eq!(
        upsert_comment(&comments, &repo, 12, &first).await.unwrap(),
        CommentAction::Created
    );
    assert_eq!(
        upsert_comment(&comments, &repo, 12, &first).await.unwrap(),
        CommentAction::Unchanged
    );
    assert_eq!(
        upsert_comment(&comments, &repo, 12, &second).await.unwrap(),
        CommentAction::Updated
    );
    assert_eq!(comments.bodies(), vec!["LGTM".to_string(), second]);
}

#[tokio::test]
async fn test_remove_deletes_stale_preview_only() {
    let repo = slug("gitpod-io/gitpod");
    let comments = FakeComments::default()
        .with_comment(1, "LGTM")
        .with_comment(2, &format!("{COMMENT_MARKER}\n## Changelog entry"));

    assert_eq!(
        remove_comment(&comments, &repo, 12).await.unwrap(),
        CommentAction::Deleted
    );
    assert_eq!(comments.bodies(), vec!["LGTM"]);
    assert_eq!(
        remove_comment(&comments, &repo, 12).await.unwrap(),
        CommentAction::Unchanged
    );
}

#[test]
fn test_no_release_note_no_comment() {
    let pr = PrBuilder::new(1, "Refactor").body("Internal only").build();
    assert!(render_comment(&pr, &slug("gitpod-io/gitpod"), &default_forest(), None, &excluded()).is_none());
}

#[test]
fn test_comment_names_category_and_labels() {
    let pr = PrBuilder::new(13376, "[code] Faster startup")
        .labels(&["editor: code (browser)", "size/M"])
        .participants(&["alice", "roboquat"])
        .note("Faster startup")
        .build();

    let comment = render_comment(
        &pr,
        &slug("gitpod-io/gitpod"),
        &default_forest(),
        Some(&deployed()),
        &excluded(),
    )
    .unwrap();

    assert!(comment.starts_with(COMMENT_MARKER));
    assert!(comment.contains("@alice"));
    assert!(comment.contains(
        "- [#13376](https://github.com/gitpod-io/gitpod/pull/13376) - Faster startup <Contributors usernames=\"alice\" />"
    ));
    assert!(comment.contains("### Category\nVS Code Browser\n"));
    assert!(comment.contains(
        "(based on https://github.com/gitpod-io/gitpod/labels/editor%3A%20code%20%28browser%29)"
    ));
    assert!(!comment.contains("size%2FM"));
}

#[test]
fn test_comment_for_prefix_only_match() {
    let pr = PrBuilder::new(7, "[jb] Gateway plugin update")
        .note("Gateway plugin update")
        .build();
    let comment =
        render_comment(&pr, &slug("gitpod-io/gitpod"), &default_forest(), None, &excluded())
            .unwrap();
    assert!(comment.contains("`JetBrains` category (based on the PR title prefix)"));
}

#[test]
fn test_comment_without_category() {
    let pr = PrBuilder::new(8, "Tweak").note("Small tweak").build();
    let comment =
        render_comment(&pr, &slug("gitpod-io/gitpod"), &default_forest(), None, &excluded())
            .unwrap();
    assert!(comment.contains("We have not been able to automatically detect a category"));
}

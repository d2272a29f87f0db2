//! Renders a filled category forest into the changelog's Markdown
//!
//! Every category with PRs, a partial, or a contributing sub-category becomes
//! one block:
//!
//! ```text
//! ## VS Code
//!
//! <partial content>
//!
//! - [#1](https://github.com/o/r/pull/1) - Faster startup <Contributors usernames="alice" />
//! ### VS Code Browser
//! ...
//! ```

use super::release_note;
use crate::partials::PartialStore;
use crate::types::{Category, CategoryForest, CategoryPath, DisplayOrder, PullRequest};
use anyhow::Result;
use chrono::NaiveDate;

pub const LINE_BREAK: &str = "\n";

/// Logins credited on a PR line: the author, then the remaining participants
/// sorted alphabetically, without excluded accounts
pub fn contributors(pr: &PullRequest, excluded_users: &[String]) -> Vec<String> {
    let author = pr.author.as_deref();
    let mut others: Vec<String> = pr
        .participants
        .iter()
        .filter(|login| Some(login.as_str()) != author)
        .filter(|login| !excluded_users.contains(login))
        .cloned()
        .collect();
    others.sort();
    others.dedup();

    author
        .map(ToString::to_string)
        .into_iter()
        .chain(others)
        .collect()
}

/// One changelog line, terminated by a line break
pub fn format_pr_line(pr: &PullRequest, excluded_users: &[String]) -> String {
    let note = release_note::extract(pr).map_or_else(
        || release_note::display_text(&pr.title),
        |note| release_note::display_text(&note),
    );
    format!(
        "- [#{}]({}) - {} <Contributors usernames=\"{}\" />{LINE_BREAK}",
        pr.number,
        pr.url,
        note,
        contributors(pr, excluded_users).join(",")
    )
}

struct Block {
    order: DisplayOrder,
    content: String,
}

/// Inputs shared by every rendered block
struct RenderContext<'a> {
    release_date: NaiveDate,
    partials: &'a dyn PartialStore,
    excluded_users: &'a [String],
}

/// Render the whole changelog section
///
/// Blocks are ordered by their partial's `order` when it sets one, by the
/// configured order otherwise. Ties keep declaration order and the catch-all
/// always comes last.
pub fn assemble(
    forest: &CategoryForest,
    release_date: NaiveDate,
    partials: &dyn PartialStore,
    excluded_users: &[String],
) -> Result<String> {
    let context = RenderContext {
        release_date,
        partials,
        excluded_users,
    };

    let mut blocks = Vec::new();
    for category in forest.categories() {
        let path = CategoryPath::top(&category.partial);
        if let Some(block) = render_category(category, &path, 2, &context)? {
            blocks.push(block);
        }
    }
    Ok(join_blocks(blocks))
}

fn join_blocks(mut blocks: Vec<Block>) -> String {
    blocks.sort_by_key(|block| block.order);
    blocks
        .into_iter()
        .map(|block| block.content)
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}

fn render_category(
    category: &Category,
    path: &CategoryPath,
    heading_level: usize,
    context: &RenderContext<'_>,
) -> Result<Option<Block>> {
    let partial = context.partials.load(context.release_date, path)?;

    let mut children = Vec::new();
    for child in &category.children {
        if let Some(block) = render_category(
            child,
            &path.child(&child.partial),
            heading_level + 1,
            context,
        )? {
            children.push(block);
        }
    }

    let order = match (category.order, partial.as_ref().and_then(|p| p.order)) {
        (DisplayOrder::Last, _) => DisplayOrder::Last,
        (_, Some(rank)) => DisplayOrder::Rank(rank),
        (configured, None) => configured,
    };
    let partial_content = partial
        .map(|p| p.content)
        .filter(|content| !content.trim().is_empty());
    let prs: String = category
        .pull_requests
        .iter()
        .map(|pr| format_pr_line(pr, context.excluded_users))
        .collect();

    if prs.is_empty() && partial_content.is_none() && children.is_empty() {
        return Ok(None);
    }

    let mut content = format!(
        "{} {}{LINE_BREAK}{LINE_BREAK}",
        "#".repeat(heading_level),
        category.name
    );
    if let Some(partial) = partial_content {
        content.push_str(&partial);
        content.push_str(LINE_BREAK);
        content.push_str(LINE_BREAK);
    }
    // a blank line separates the list from any sub-category heading
    if !prs.is_empty() {
        content.push_str(&prs);
        content.push_str(LINE_BREAK);
    }
    if !children.is_empty() {
        content.push_str(&join_blocks(children));
    }

    Ok(Some(Block { order, content }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PullRequestState;

    fn pr(author: Option<&str>, participants: &[&str]) -> PullRequest {
        PullRequest {
            number: 7,
            url: "https://github.com/gitpod-io/gitpod/pull/7".to_string(),
            state: PullRequestState::Open,
            is_draft: false,
            title: "[code] fix".to_string(),
            body: "## Release Notes\n[code] fix the thing\n".to_string(),
            author: author.map(ToString::to_string),
            participants: participants.iter().map(ToString::to_string).collect(),
            labels: Vec::new(),
            assignees: Vec::new(),
            merged_at: None,
            merge_commit: None,
            label_events: Vec::new(),
        }
    }

    #[test]
    fn test_contributors_author_first_then_sorted() {
        let excluded = vec!["roboquat".to_string()];
        let pr = pr(Some("zed"), &["carol", "zed", "roboquat", "alice"]);
        assert_eq!(contributors(&pr, &excluded), vec!["zed", "alice", "carol"]);
    }

    #[test]
    fn test_format_pr_line_strips_prefix() {
        let line = format_pr_line(&pr(Some("alice"), &[]), &[]);
        assert_eq!(
            line,
            "- [#7](https://github.com/gitpod-io/gitpod/pull/7) - Fix the thing <Contributors usernames=\"alice\" />\n"
        );
    }
}

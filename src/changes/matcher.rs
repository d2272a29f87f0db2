//! Decides which categories a pull request is filed under

use super::release_note::CATEGORY_DIRECTIVE;
use crate::types::{Category, CategoryForest, CategoryPath, PullRequest};

/// Why a category was considered a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    /// Named in a `Category:` directive
    Override,
    Label,
    /// Only a `[prefix]` on the title or release note matched
    PrefixOnly,
}

/// A PR that looks like it belongs to a labelled category but lacks the label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MislabelWarning {
    pub pr_number: u64,
    pub pr_title: String,
    pub category: String,
    pub expected_labels: Vec<String>,
}

impl std::fmt::Display for MislabelWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} \"{}\" is categorized as {} but it doesn't have the label {}",
            self.pr_number,
            self.pr_title,
            self.category,
            self.expected_labels.join(", ")
        )
    }
}

/// Outcome of matching one PR against the forest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMatch {
    /// Surviving paths; empty means the PR belongs to the catch-all
    pub paths: Vec<(CategoryPath, MatchReason)>,
    pub warnings: Vec<MislabelWarning>,
    /// Names in a `Category:` directive that matched no category
    pub unknown_overrides: Vec<String>,
}

impl CategoryMatch {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn path_list(&self) -> Vec<CategoryPath> {
        self.paths.iter().map(|(path, _)| path.clone()).collect()
    }
}

/// Names listed in a `Category:` directive, if the note carries one
pub fn category_override(note: &str) -> Option<Vec<String>> {
    let captures = CATEGORY_DIRECTIVE.captures(note)?;
    let names: Vec<String> = captures
        .get(1)?
        .as_str()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect();
    if names.is_empty() { None } else { Some(names) }
}

/// Match a PR (with its extracted release note) against the category forest
///
/// A `Category:` directive wins over inference when at least one of its names
/// resolves. Otherwise every category whose labels or prefixes match is
/// recorded, and a matching sub-category suppresses its own parent.
pub fn match_pull_request(
    pr: &PullRequest,
    note: &str,
    forest: &CategoryForest,
) -> CategoryMatch {
    let mut result = CategoryMatch::default();

    if let Some(names) = category_override(note) {
        for name in names {
            match forest.resolve_name(&name) {
                Some(path) => {
                    if !result.paths.iter().any(|(p, _)| *p == path) {
                        result.paths.push((path, MatchReason::Override));
                    }
                }
                None => result.unknown_overrides.push(name),
            }
        }
        if !result.paths.is_empty() {
            return result;
        }
    }

    let mut recorded: Vec<(CategoryPath, MatchReason)> = Vec::new();
    for category in forest.categories() {
        let parent_path = CategoryPath::top(&category.partial);
        for child in &category.children {
            if let Some(reason) = match_reason(pr, note, child) {
                recorded.push((parent_path.child(&child.partial), reason));
            }
        }
        if let Some(reason) = match_reason(pr, note, category) {
            recorded.push((parent_path, reason));
        }
    }

    let maximal: Vec<(CategoryPath, MatchReason)> = recorded
        .iter()
        .filter(|(path, _)| {
            !recorded
                .iter()
                .any(|(other, _)| path.is_strict_prefix_of(other))
        })
        .cloned()
        .collect();

    for (path, reason) in &maximal {
        if *reason != MatchReason::PrefixOnly {
            continue;
        }
        if let Some(category) = forest.get(path)
            && !category.labels.is_empty()
        {
            result.warnings.push(MislabelWarning {
                pr_number: pr.number,
                pr_title: pr.title.clone(),
                category: category.name.clone(),
                expected_labels: category.labels.clone(),
            });
        }
    }

    result.paths = maximal;
    result
}

fn match_reason(pr: &PullRequest, note: &str, category: &Category) -> Option<MatchReason> {
    if category.labels.iter().any(|label| pr.has_label(label)) {
        return Some(MatchReason::Label);
    }
    let by_prefix = category.prefixes.iter().any(|prefix| {
        let bracketed = format!("[{prefix}]");
        note.starts_with(&bracketed) || pr.title.starts_with(&bracketed)
    });
    by_prefix.then_some(MatchReason::PrefixOnly)
}

/// The category a single PR would be shown under, used for previews
///
/// Returns the display names of all matched categories, or `None` when the
/// PR would land in the catch-all.
pub fn describe_match(pr: &PullRequest, note: &str, forest: &CategoryForest) -> Option<Vec<String>> {
    let matched = match_pull_request(pr, note, forest);
    if matched.is_empty() {
        return None;
    }
    Some(
        matched
            .paths
            .iter()
            .filter_map(|(path, _)| forest.get(path).map(|c| c.name.clone()))
            .collect(),
    )
}

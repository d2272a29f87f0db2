//! Release note extraction from pull request bodies
//!
//! Two conventions are supported:
//!
//! - The legacy fenced block, opened with ```` ```release-note ```` (or
//!   ```` ```release-notes ````) and closed with ```` ``` ````
//! - A `## Release Notes` section, running until the next level-2 heading
//!
//! Either form is treated as absent when its content is `NONE`.

use crate::types::PullRequest;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

const RELEASE_NOTES_HEADING: &str = "Release Notes";
const LEGACY_FENCE_OPENER: &str = "```release-note";

static LEGACY_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```release-notes?(.+?)```").expect("Failed to compile release-note regex")
});

static HTML_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Failed to compile comment regex"));

/// `Category: <name>[, <name>...]` on a line of its own
pub(crate) static CATEGORY_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*category:[ \t]*(.*?)[ \t]*$")
        .expect("Failed to compile category directive regex")
});

static LEADING_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[[^\]\n]+\] ?").expect("Failed to compile prefix regex")
});

/// Extract the release note of a pull request
pub fn extract(pr: &PullRequest) -> Option<String> {
    extract_release_note(&pr.body)
}

/// Extract the release note from a PR body, `None` when there is none
///
/// The legacy fenced block wins whenever it is present; the heading
/// convention is only consulted for bodies without one.
pub fn extract_release_note(body: &str) -> Option<String> {
    if let Some(interior) = legacy_block(body) {
        return meaningful(interior.trim());
    }
    heading_section(body)
}

/// Interior of the first legacy fenced block, if any
fn legacy_block(body: &str) -> Option<&str> {
    LEGACY_BLOCK
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|interior| interior.as_str())
}

fn meaningful(note: &str) -> Option<String> {
    if note.is_empty() || note.eq_ignore_ascii_case("NONE") {
        None
    } else {
        Some(note.to_string())
    }
}

/// Text under the `## Release Notes` heading, comments stripped
fn heading_section(body: &str) -> Option<String> {
    let headings = top_level_h2_headings(body);
    let position = headings
        .iter()
        .position(|(_, text)| text.trim().eq_ignore_ascii_case(RELEASE_NOTES_HEADING))?;

    let start = headings[position].0.end;
    let end = headings
        .get(position + 1)
        .map_or(body.len(), |(range, _)| range.start);
    let section = body.get(start..end)?;

    let stripped = HTML_COMMENT.replace_all(section, "");
    let note = stripped.trim();
    if note.starts_with(LEGACY_FENCE_OPENER) {
        return None;
    }
    meaningful(note)
}

/// Source ranges and plain text of every level-2 heading outside containers
fn top_level_h2_headings(body: &str) -> Vec<(Range<usize>, String)> {
    let mut headings = Vec::new();
    let mut current: Option<(Range<usize>, String)> = None;
    let mut depth = 0usize;

    for (event, range) in Parser::new(body).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H2,
                ..
            }) if depth == 0 => {
                current = Some((range, String::new()));
                depth += 1;
            }
            Event::Start(_) => depth += 1,
            Event::End(TagEnd::Heading(HeadingLevel::H2)) if depth == 1 => {
                if let Some(heading) = current.take() {
                    headings.push(heading);
                }
                depth -= 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, heading_text)) = current.as_mut() {
                    heading_text.push_str(&text);
                }
            }
            _ => {}
        }
    }

    headings
}

/// Text of a release note as it appears in the changelog
///
/// Drops `Category:` directive lines and a leading `[prefix]`, then
/// capitalizes the first letter.
pub fn display_text(note: &str) -> String {
    let without_directives = note
        .lines()
        .filter(|line| !CATEGORY_DIRECTIVE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n");
    let without_prefix = LEADING_PREFIX.replace(without_directives.trim(), "");
    capitalize_first(without_prefix.trim())
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

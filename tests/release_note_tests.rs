#![allow(clippy::unwrap_used)]

use docs_changelog::changes::{display_text, extract, extract_release_note};

use test_utils::PrBuilder;

#[test]
fn test_legacy_block_note() {
    let body = "Some description\n\n```release-note\nAdd the thing\n```\n";
    assert_eq!(extract_release_note(body).as_deref(), Some("Add the thing"));
}

#[test]
fn test_legacy_block_plural_tag() {
    let body = "```release-notes\n  Improve the other thing  \n```";
    assert_eq!(
        extract_release_note(body).as_deref(),
        Some("Improve the other thing")
    );
}

#[test]
fn test_legacy_block_none_is_absent() {
    for none in ["NONE", "none", " None "] {
        let body = format!("```release-note\n{none}\n```");
        assert_eq!(extract_release_note(&body), None, "{none:?} should be absent");
    }
}

#[test]
fn test_none_mid_sentence_is_kept() {
    let body = "```release-note\nAdd NONE as a possible release note\n```";
    assert_eq!(
        extract_release_note(body).as_deref(),
        Some("Add NONE as a possible release note")
    );
}

#[test]
fn test_legacy_block_wins_over_heading() {
    let body = "## Release Notes\nFrom the heading\n\n```release-note\nFrom the block\n```";
    assert_eq!(extract_release_note(body).as_deref(), Some("From the block"));

    let none_block = "## Release Notes\nFrom the heading\n\n```release-note\nNONE\n```";
    assert_eq!(extract_release_note(none_block), None);
}

#[test]
fn test_heading_section_until_next_heading() {
    let body = "## Description\nThis changes things\n\n## Release Notes\n<!-- Write your note below -->\nFaster workspace starts\n\n## How to test\nStart a workspace";
    assert_eq!(
        extract_release_note(body).as_deref(),
        Some("Faster workspace starts")
    );
}

#[test]
fn test_heading_section_runs_to_end_of_body() {
    let body = "## release notes\r\nAdded a dark theme\r\n";
    assert_eq!(extract_release_note(body).as_deref(), Some("Added a dark theme"));
}

#[test]
fn test_heading_section_keeps_deeper_headings() {
    let body = "## Release Notes\nNew dashboard\n### Details\nMore words\n## Other\nignored";
    assert_eq!(
        extract_release_note(body).as_deref(),
        Some("New dashboard\n### Details\nMore words")
    );
}

#[test]
fn test_heading_section_multiline_comment_stripped() {
    let body = "## Release Notes\n<!--\nPlease describe\nthe change\n-->\nNONE\n";
    assert_eq!(extract_release_note(body), None);
}

#[test]
fn test_heading_section_empty_is_absent() {
    let body = "## Release Notes\n<!-- nothing -->\n\n## Next\ntext";
    assert_eq!(extract_release_note(body), None);
}

#[test]
fn test_unterminated_legacy_fence_under_heading_is_absent() {
    let body = "## Release Notes\n```release-note\nhalf migrated";
    assert_eq!(extract_release_note(body), None);
}

#[test]
fn test_no_release_notes_heading() {
    assert_eq!(extract_release_note("## Description\nJust a fix"), None);
    assert_eq!(extract_release_note(""), None);
}

#[test]
fn test_heading_inside_code_block_is_ignored() {
    let body = "```md\n## Release Notes\nnot real\n```\n";
    assert_eq!(extract_release_note(body), None);
}

#[test]
fn test_extract_reads_pull_request_body() {
    let pr = PrBuilder::new(1, "[code] Something").note("Something nice").build();
    assert_eq!(extract(&pr).as_deref(), Some("Something nice"));
}

#[test]
fn test_display_text_strips_prefix_and_directive() {
    let note = "[dashboard] show usage\nCategory: Dashboard";
    assert_eq!(display_text(note), "Show usage");
}

#[test]
fn test_display_text_only_strips_leading_prefix() {
    assert_eq!(
        display_text("[jb] support [beta] builds"),
        "Support [beta] builds"
    );
}

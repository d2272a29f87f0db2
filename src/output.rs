//! The changelog document written for each release
//!
//! `<changelog_path>/<release_date>/index.md` starts life as a copy of
//! `<changelog_path>/_template.md`. Only the region between the generated
//! block markers is rewritten on later runs, so hand edits elsewhere survive.

use crate::changes::LINE_BREAK;
use crate::dates::format_date;
use crate::log_debug;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

pub const TEMPLATE_FILE: &str = "_template.md";
pub const DOCUMENT_FILE: &str = "index.md";
pub const GENERATED_BLOCK: &str = "AUTOGENERATED_CHANGES";
const RELEASE_DATE_PLACEHOLDER: &str = "{{releaseDate}}";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Could not find {start} and/or {end} in the changelog file")]
    MissingMarkers { start: String, end: String },
}

fn markers(block_name: &str) -> (String, String) {
    (
        format!("<!--- BEGIN_{block_name} -->"),
        format!("<!--- END_{block_name} -->"),
    )
}

/// Replace everything between the `BEGIN_<name>` and `END_<name>` markers
///
/// Both markers are kept; the new content sits on its own lines between them.
pub fn replace_block(
    block_name: &str,
    content: &str,
    document: &str,
) -> Result<String, TemplateError> {
    let (start, end) = markers(block_name);
    let (Some(start_index), Some(end_index)) = (document.find(&start), document.find(&end))
    else {
        return Err(TemplateError::MissingMarkers { start, end });
    };
    let head_end = start_index + start.len();
    if end_index < head_end {
        return Err(TemplateError::MissingMarkers { start, end });
    }

    Ok([&document[..head_end], content, &document[end_index..]].join(LINE_BREAK))
}

/// Substitute the release date placeholder and fill in the generated block
pub fn render_document(
    template: &str,
    release_date: NaiveDate,
    generated: &str,
) -> Result<String, TemplateError> {
    let dated = template.replace(RELEASE_DATE_PLACEHOLDER, &format_date(release_date));
    replace_block(GENERATED_BLOCK, generated, &dated)
}

/// Options controlling how the document is produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Start over from the template even when the document exists
    pub force: bool,
    /// Print instead of writing
    pub dry_run: bool,
    /// With `dry_run`, print only the generated block
    pub only_prs: bool,
}

/// What a call to [`ChangelogDocument::write`] produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    /// Dry run; the text that would have been written (or the PR block alone)
    Preview(String),
}

/// Locations of one release's changelog files
#[derive(Debug, Clone)]
pub struct ChangelogDocument {
    changelog_path: PathBuf,
    release_date: NaiveDate,
}

impl ChangelogDocument {
    pub fn new(changelog_path: &Path, release_date: NaiveDate) -> Self {
        Self {
            changelog_path: changelog_path.to_path_buf(),
            release_date,
        }
    }

    pub fn template_path(&self) -> PathBuf {
        self.changelog_path.join(TEMPLATE_FILE)
    }

    pub fn release_dir(&self) -> PathBuf {
        self.changelog_path.join(format_date(self.release_date))
    }

    pub fn document_path(&self) -> PathBuf {
        self.release_dir().join(DOCUMENT_FILE)
    }

    /// Text the generated block is merged into: the existing document, or
    /// the template when there is none yet or `force` is set
    fn base_text(&self, force: bool) -> Result<String> {
        let document = self.document_path();
        let source = if !force && document.exists() {
            document
        } else {
            self.template_path()
        };
        log_debug!("Rendering changelog from {}", source.display());
        fs::read_to_string(&source)
            .with_context(|| format!("Failed to read {}", source.display()))
    }

    pub fn write(&self, generated: &str, options: WriteOptions) -> Result<WriteOutcome> {
        if options.dry_run && options.only_prs {
            return Ok(WriteOutcome::Preview(generated.to_string()));
        }

        let base = self.base_text(options.force)?;
        let rendered = render_document(&base, self.release_date, generated)?;

        if options.dry_run {
            return Ok(WriteOutcome::Preview(rendered));
        }

        let release_dir = self.release_dir();
        fs::create_dir_all(&release_dir)
            .with_context(|| format!("Failed to create {}", release_dir.display()))?;
        let document = self.document_path();
        fs::write(&document, rendered)
            .with_context(|| format!("Failed to write {}", document.display()))?;
        Ok(WriteOutcome::Written(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_marker_before_start_is_rejected() {
        let doc = "<!--- END_X -->\n<!--- BEGIN_X -->";
        assert!(replace_block("X", "c", doc).is_err());
    }
}

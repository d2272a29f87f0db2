//! Hand-written changelog content stored next to the generated document
//!
//! A partial lives at `<changelog_path>/<release_date>/<key>.md` where `key`
//! is the dotted category path (`vscode.browser`). It may start with a YAML
//! front matter block that overrides the category's position:
//!
//! ```text
//! ---
//! order: 2
//! ---
//! Some words about this month's VS Code work.
//! ```

use crate::dates::format_date;
use crate::types::CategoryPath;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static FRONT_MATTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|\z)")
        .expect("Failed to compile front matter regex")
});

#[derive(Deserialize, Debug, Default)]
struct FrontMatter {
    order: Option<i64>,
}

/// Partial content with its front matter split off
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Partial {
    pub content: String,
    /// Position override from the front matter
    pub order: Option<i64>,
}

impl Partial {
    /// Split raw file contents into front matter and body
    pub fn parse(raw: &str) -> Result<Self> {
        let Some(captures) = FRONT_MATTER.captures(raw) else {
            return Ok(Self {
                content: raw.trim().to_string(),
                order: None,
            });
        };

        let yaml = captures.get(1).map_or("", |m| m.as_str());
        let front_matter: FrontMatter = if yaml.trim().is_empty() {
            FrontMatter::default()
        } else {
            serde_yaml::from_str(yaml).context("Invalid partial front matter")?
        };
        let body_start = captures.get(0).map_or(0, |m| m.end());

        Ok(Self {
            content: raw[body_start..].trim().to_string(),
            order: front_matter.order,
        })
    }
}

/// Lookup of hand-written content per release and category
pub trait PartialStore {
    /// `Ok(None)` when no partial exists for the category
    fn load(&self, release_date: NaiveDate, path: &CategoryPath) -> Result<Option<Partial>>;
}

/// Partials read from the changelog directory
#[derive(Debug, Clone)]
pub struct FsPartialStore {
    root: PathBuf,
}

impl FsPartialStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn path(&self, release_date: NaiveDate, path: &CategoryPath) -> PathBuf {
        self.root
            .join(format_date(release_date))
            .join(format!("{path}.md"))
    }
}

impl PartialStore for FsPartialStore {
    fn load(&self, release_date: NaiveDate, path: &CategoryPath) -> Result<Option<Partial>> {
        let file = self.path(release_date, path);
        match fs::read_to_string(&file) {
            Ok(raw) => Partial::parse(&raw)
                .with_context(|| format!("Failed to parse {}", file.display()))
                .map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", file.display())),
        }
    }
}

/// A store with no partials at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPartials;

impl PartialStore for NoPartials {
    fn load(&self, _release_date: NaiveDate, _path: &CategoryPath) -> Result<Option<Partial>> {
        Ok(None)
    }
}

//! Run metadata persisted next to each changelog
//!
//! Stored as `<changelog_path>/<release_date>/meta.json`. The released policy
//! records the tag it saw for each repository so the next run can pick up
//! where this one stopped.

use crate::dates::{format_date, parse_date};
use crate::types::RepoSlug;
use crate::{log_debug, log_info};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::{Map, Value, json};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const METADATA_FILE: &str = "meta.json";

/// Contents of one `meta.json`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunMetadata(Value);

impl RunMetadata {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Release tag recorded for `repo`, if any
    pub fn repository_version(&self, repo: &RepoSlug) -> Option<&str> {
        self.0
            .get("repos")?
            .get(repo.to_string())?
            .get("version")?
            .as_str()
    }
}

/// Recursively merge `patch` into `target`; objects merge, anything else replaces
pub fn deep_merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                deep_merge(target.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}

/// Reads and writes run metadata below the changelog directory
#[derive(Debug, Clone)]
pub struct MetadataStore {
    root: PathBuf,
    dry_run: bool,
}

impl MetadataStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            dry_run: false,
        }
    }

    /// Skip every write, logging what would have been stored
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn path(&self, release_date: NaiveDate) -> PathBuf {
        self.root
            .join(format_date(release_date))
            .join(METADATA_FILE)
    }

    /// Load the metadata of a release, `None` when it was never written
    pub fn read(&self, release_date: NaiveDate) -> Result<Option<RunMetadata>> {
        let path = self.path(release_date);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(RunMetadata(value)))
    }

    /// Deep-merge `patch` into the stored metadata of a release
    pub fn merge(&self, release_date: NaiveDate, patch: Value) -> Result<()> {
        let path = self.path(release_date);
        if self.dry_run {
            log_info!("Dry run: not writing {} with {}", path.display(), patch);
            return Ok(());
        }

        let mut current = self
            .read(release_date)?
            .map_or_else(|| Value::Object(Map::new()), |meta| meta.0);
        deep_merge(&mut current, patch);
        atomic_write(&path, &current)?;
        log_debug!("Updated {}", path.display());
        Ok(())
    }

    pub fn record_repository_version(
        &self,
        release_date: NaiveDate,
        repo: &RepoSlug,
        version: &str,
    ) -> Result<()> {
        self.merge(
            release_date,
            json!({ "repos": { repo.to_string(): { "version": version } } }),
        )
    }

    /// The latest changelog directory dated strictly before `release_date`
    pub fn previous_release_date(&self, release_date: NaiveDate) -> Result<Option<NaiveDate>> {
        if !self.root.exists() {
            return Ok(None);
        }
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to list {}", self.root.display()))?;

        let mut previous: Option<NaiveDate> = None;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(date) = entry
                .file_name()
                .to_str()
                .and_then(|name| parse_date(name).ok())
            else {
                continue;
            };
            if date < release_date && previous.is_none_or(|best| date > best) {
                previous = Some(date);
            }
        }
        Ok(previous)
    }
}

/// Write through a temp file and rename it into place
fn atomic_write(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;

    let temp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_merge_keeps_sibling_keys() {
        let mut target = json!({ "repos": { "a/b": { "version": "1" } }, "note": "x" });
        deep_merge(
            &mut target,
            json!({ "repos": { "c/d": { "version": "2" } } }),
        );
        assert_eq!(
            target,
            json!({
                "repos": { "a/b": { "version": "1" }, "c/d": { "version": "2" } },
                "note": "x"
            })
        );
    }
}

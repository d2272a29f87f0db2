//! Per-repository inclusion policies
//!
//! Each tracked repository decides on its own which merged PRs belong to the
//! current changelog and in which order they are listed.

use crate::dates::{DATE_FORMAT, format_date};
use crate::log_debug;
use crate::metadata::MetadataStore;
use crate::source::{ComparisonStatus, PullRequestSource, Release, SearchQuery};
use crate::types::{PullRequest, RepoSlug};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

fn default_deployed_label() -> String {
    "deployed".to_string()
}

fn default_lookback_days() -> i64 {
    60
}

/// How a repository's PRs qualify for the changelog
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InclusionPolicy {
    /// Every PR merged inside the window, newest merge first
    #[default]
    Merged,
    /// PRs whose latest `label` event falls inside the window, newest deployment first
    Deployed {
        #[serde(default = "default_deployed_label")]
        label: String,
        /// PRs merged this many days before the window can still be deployed inside it
        #[serde(default = "default_lookback_days")]
        lookback_days: i64,
        /// Extra search qualifiers, e.g. `-label:release-note-none`
        #[serde(default)]
        extra_qualifiers: String,
    },
    /// PRs shipped by a tagged release since the previous changelog run
    Released,
}

/// The requested changelog window, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// First instant of `from`, UTC
    pub fn start(self) -> DateTime<Utc> {
        self.from.and_time(NaiveTime::MIN).and_utc()
    }

    /// Last millisecond of `to`, UTC
    pub fn end(self) -> DateTime<Utc> {
        let end_of_day =
            NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        self.to.and_time(end_of_day).and_utc()
    }

    pub fn contains(self, instant: DateTime<Utc>) -> bool {
        instant >= self.start() && instant <= self.end()
    }
}

/// Everything a policy may consult besides the source
pub struct PolicyContext<'a> {
    pub release_date: NaiveDate,
    pub metadata: &'a MetadataStore,
}

impl InclusionPolicy {
    /// The search to run for `repo` within `window`
    pub fn search_query(&self, repo: &RepoSlug, window: DateWindow) -> SearchQuery {
        let to = format_date(window.to);
        match self {
            Self::Merged | Self::Released => SearchQuery::new(
                repo.clone(),
                format!(
                    "is:pr is:merged merged:{}..{to} sort:updated-desc",
                    format_date(window.from)
                ),
            ),
            Self::Deployed {
                label,
                lookback_days,
                extra_qualifiers,
            } => {
                let widened_from = window.from - Duration::days(*lookback_days);
                SearchQuery::new(
                    repo.clone(),
                    format!(
                        "is:pr is:merged merged:{}..{to} sort:updated-desc label:{} {}",
                        widened_from.format(DATE_FORMAT),
                        quote_qualifier(label),
                        extra_qualifiers.trim()
                    ),
                )
            }
        }
    }

    /// Keep the qualifying PRs and put them in listing order
    pub async fn select(
        &self,
        source: &dyn PullRequestSource,
        repo: &RepoSlug,
        window: DateWindow,
        candidates: Vec<PullRequest>,
        context: &PolicyContext<'_>,
    ) -> Result<Vec<PullRequest>> {
        match self {
            Self::Merged => Ok(sort_by_merged(candidates)),
            Self::Deployed { label, .. } => Ok(select_deployed(label, window, candidates)),
            Self::Released => select_released(source, repo, candidates, context).await,
        }
    }
}

fn quote_qualifier(value: &str) -> String {
    if value.contains(char::is_whitespace) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// Newest merge first; unmerged records sink to the bottom
pub fn sort_by_merged(mut prs: Vec<PullRequest>) -> Vec<PullRequest> {
    prs.sort_by_key(|pr| Reverse(pr.merged_at));
    prs
}

/// PRs whose most recent `label` event lies inside `window`, newest first
pub fn select_deployed(label: &str, window: DateWindow, prs: Vec<PullRequest>) -> Vec<PullRequest> {
    let mut deployed: Vec<(DateTime<Utc>, PullRequest)> = prs
        .into_iter()
        .filter_map(|pr| {
            let deployed_at = pr.last_labeled_at(label)?;
            window.contains(deployed_at).then_some((deployed_at, pr))
        })
        .collect();
    deployed.sort_by_key(|(deployed_at, _)| Reverse(*deployed_at));
    deployed.into_iter().map(|(_, pr)| pr).collect()
}

/// PRs contained in the latest release but not in the release the previous
/// changelog run recorded
async fn select_released(
    source: &dyn PullRequestSource,
    repo: &RepoSlug,
    candidates: Vec<PullRequest>,
    context: &PolicyContext<'_>,
) -> Result<Vec<PullRequest>> {
    if candidates.is_empty() {
        return Ok(candidates);
    }

    let latest = source
        .latest_release(repo)
        .await
        .with_context(|| format!("Failed to fetch the latest release of {repo}"))?;
    context
        .metadata
        .record_repository_version(context.release_date, repo, &latest.tag_name)?;

    let previous = previous_release(source, repo, context).await?;

    let mut selected = Vec::new();
    for pr in candidates {
        let Some(merge_commit) = pr.merge_commit.as_deref() else {
            log_debug!("Skipping #{} of {}: no merge commit", pr.number, repo);
            continue;
        };

        let ahead_of_latest = source
            .compare_commits(repo, &latest.target_commitish, merge_commit)
            .await?
            == ComparisonStatus::Ahead;
        if ahead_of_latest {
            continue;
        }

        let include = match &previous {
            Some(previous) => {
                source
                    .compare_commits(repo, &previous.target_commitish, merge_commit)
                    .await?
                    == ComparisonStatus::Ahead
            }
            None => true,
        };
        if include {
            selected.push(pr);
        }
    }

    Ok(sort_by_merged(selected))
}

async fn previous_release(
    source: &dyn PullRequestSource,
    repo: &RepoSlug,
    context: &PolicyContext<'_>,
) -> Result<Option<Release>> {
    let Some(previous_date) = context.metadata.previous_release_date(context.release_date)? else {
        crate::log_warn!("No previous changelog release found for {}", repo);
        return Ok(None);
    };
    let Some(tag) = context
        .metadata
        .read(previous_date)?
        .and_then(|meta| meta.repository_version(repo).map(ToString::to_string))
    else {
        crate::log_warn!(
            "Changelog of {} recorded no release for {}",
            format_date(previous_date),
            repo
        );
        return Ok(None);
    };

    let release = source
        .release_by_tag(repo, &tag)
        .await
        .with_context(|| format!("Failed to fetch release {tag} of {repo}"))?;
    Ok(Some(release))
}

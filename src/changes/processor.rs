//! Turns each tracked repository into a list of category assignments
//!
//! Repositories are processed one after another. The processor never touches
//! the forest; the caller folds the collected assignments in once every
//! repository is done.

use super::matcher::{MislabelWarning, match_pull_request};
use super::policy::{DateWindow, PolicyContext};
use super::release_note;
use crate::config::RepositoryConfig;
use crate::dates::format_date;
use crate::source::PullRequestSource;
use crate::types::{Assignment, CategoryForest, ForestError};
use crate::{log_debug, log_info, log_warn};
use anyhow::{Context, Result};

/// Everything one or more repositories contributed to the changelog
#[derive(Debug, Default, Clone)]
pub struct RepositoryBatch {
    pub assignments: Vec<Assignment>,
    pub warnings: Vec<MislabelWarning>,
    /// `Category:` names that resolved to nothing, as `(pr number, name)`
    pub unknown_overrides: Vec<(u64, String)>,
}

impl RepositoryBatch {
    pub fn extend(&mut self, other: Self) {
        self.assignments.extend(other.assignments);
        self.warnings.extend(other.warnings);
        self.unknown_overrides.extend(other.unknown_overrides);
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Fetch, filter and categorize the qualifying PRs of one repository
pub async fn process_repository(
    source: &dyn PullRequestSource,
    repository: &RepositoryConfig,
    forest: &CategoryForest,
    window: DateWindow,
    context: &PolicyContext<'_>,
) -> Result<RepositoryBatch> {
    let repo = &repository.slug;
    if let Some(path) = &repository.force_category
        && !forest.contains(path)
    {
        return Err(ForestError::UnknownPath(path.to_string()))
            .with_context(|| format!("Invalid forced category for {repo}"));
    }

    let query = repository.policy.search_query(repo, window);
    log_debug!("Searching {}: {}", repo, query.to_query_string());
    let candidates = source
        .search_pull_requests(&query)
        .await
        .with_context(|| format!("Failed to search pull requests of {repo}"))?;

    let selected = repository
        .policy
        .select(source, repo, window, candidates, context)
        .await?;

    let mut batch = RepositoryBatch::default();
    for pr in selected {
        let Some(note) = release_note::extract(&pr) else {
            log_debug!("#{} of {} has no release note, skipping", pr.number, repo);
            continue;
        };

        if let Some(path) = &repository.force_category {
            batch.assignments.push(Assignment {
                path: path.clone(),
                pull_request: pr,
            });
            continue;
        }

        let matched = match_pull_request(&pr, &note, forest);
        for name in matched.unknown_overrides {
            log_warn!(
                "#{} of {} names unknown category '{}', ignoring it",
                pr.number,
                repo,
                name
            );
            batch.unknown_overrides.push((pr.number, name));
        }
        for warning in matched.warnings {
            log_warn!("{}", warning);
            batch.warnings.push(warning);
        }

        if matched.paths.is_empty() {
            batch.assignments.push(Assignment {
                path: forest.catch_all_path(),
                pull_request: pr,
            });
        } else {
            for (path, _) in matched.paths {
                batch.assignments.push(Assignment {
                    path,
                    pull_request: pr.clone(),
                });
            }
        }
    }

    if batch.is_empty() {
        log_info!(
            "No pull requests from {} between {} and {}",
            repo,
            format_date(window.from),
            format_date(window.to)
        );
    } else {
        log_info!("{} assignments from {}", batch.assignments.len(), repo);
    }
    Ok(batch)
}

/// Process every repository in order and fold the result into `forest`
pub async fn collect(
    source: &dyn PullRequestSource,
    repositories: &[RepositoryConfig],
    forest: CategoryForest,
    window: DateWindow,
    context: &PolicyContext<'_>,
) -> Result<(CategoryForest, RepositoryBatch)> {
    let mut combined = RepositoryBatch::default();
    for repository in repositories {
        let batch = process_repository(source, repository, &forest, window, context).await?;
        combined.extend(batch);
    }

    let filled = forest.file(combined.assignments.clone())?;
    Ok((filled, combined))
}

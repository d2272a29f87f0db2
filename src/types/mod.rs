//! Data model shared by the changelog pipeline
//!
//! - Pull requests fetched from the tracked repositories
//! - The category tree PRs are filed into

mod category;
mod pull_request;

pub use category::{Assignment, Category, CategoryForest, CategoryPath, DisplayOrder, ForestError};
pub use pull_request::{LabelEvent, PullRequest, PullRequestState, RepoSlug};

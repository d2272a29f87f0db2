//! docs-changelog - monthly changelog generation for the documentation site
//!
//! Collects merged and deployed pull requests from the tracked repositories,
//! files their release notes into changelog categories and renders the
//! changelog Markdown, a Slack summary or a per-PR preview comment.

#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::format_push_string)] // Performance improvement but stylistic
#![allow(clippy::return_self_not_must_use)] // Builder pattern is clear enough
#![allow(clippy::items_after_statements)] // Locally-scoped use statements are fine

pub mod changes;
pub mod cli;
pub mod config;
pub mod dates;
pub mod logger;
pub mod metadata;
pub mod notify;
pub mod output;
pub mod partials;
pub mod preview;
pub mod source;
pub mod types;
pub mod ui;

pub use config::{ChangelogConfig, RepositoryConfig};
pub use source::{GitHubClient, PullRequestSource};
pub use types::{Category, CategoryForest, CategoryPath, PullRequest};

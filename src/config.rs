use crate::changes::InclusionPolicy;
use crate::log_debug;
use crate::types::{Category, CategoryForest, CategoryPath, DisplayOrder, ForestError, RepoSlug};

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Project configuration filename, looked up in the working directory
pub const PROJECT_CONFIG_FILENAME: &str = ".changelog.toml";

/// Environment variable holding the GitHub token by default
pub const DEFAULT_TOKEN_ENV: &str = "CHANGELOG_GITHUB_ACCESS_TOKEN";

/// Problems found while validating a loaded configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid category configuration: {0}")]
    Categories(#[from] ForestError),
    #[error("Repository {repo} forces unknown category '{path}'")]
    UnknownForcedCategory { repo: RepoSlug, path: CategoryPath },
    #[error("Repository {0} is configured more than once")]
    DuplicateRepository(RepoSlug),
    #[error("Deployed policy of {0} needs a non-empty label")]
    EmptyDeployLabel(RepoSlug),
}

/// A repository whose PRs feed the changelog
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub slug: RepoSlug,
    #[serde(default)]
    pub policy: InclusionPolicy,
    /// File every PR of this repository under one category, skipping inference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_category: Option<CategoryPath>,
}

impl RepositoryConfig {
    pub fn new(slug: RepoSlug, policy: InclusionPolicy) -> Self {
        Self {
            slug,
            policy,
            force_category: None,
        }
    }

    pub fn forced_to(mut self, path: &str) -> Self {
        self.force_category = path.parse().ok();
        self
    }
}

/// Configuration of the changelog generator
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct ChangelogConfig {
    /// Directory holding `_template.md` and one directory per release date
    pub changelog_path: PathBuf,
    pub repositories: Vec<RepositoryConfig>,
    /// Accounts never credited as contributors
    pub excluded_users: Vec<String>,
    pub categories: Vec<Category>,
    /// Channel the chat summary is posted to unless `SLACK_CHANNEL` is set
    pub slack_channel: String,
    /// Repository the monthly changelog PR is opened against
    pub changelog_repository: RepoSlug,
    /// Environment variable the GitHub token is read from
    pub token_env: String,
    /// Where this configuration was loaded from, if not built in
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            changelog_path: PathBuf::from("src/lib/contents/changelog"),
            repositories: default_repositories(),
            excluded_users: vec![
                "dependabot[bot]".to_string(),
                "roboquat".to_string(),
                "github-actions".to_string(),
            ],
            categories: default_categories(),
            slack_channel: "#changelog".to_string(),
            changelog_repository: RepoSlug::new("gitpod-io", "website"),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            source_path: None,
        }
    }
}

fn default_repositories() -> Vec<RepositoryConfig> {
    vec![
        RepositoryConfig::new(
            RepoSlug::new("gitpod-io", "gitpod"),
            InclusionPolicy::Deployed {
                label: "deployed".to_string(),
                lookback_days: 60,
                extra_qualifiers: "-label:release-note-none -project:gitpod-io/22".to_string(),
            },
        ),
        RepositoryConfig::new(RepoSlug::new("gitpod-io", "website"), InclusionPolicy::Merged),
        RepositoryConfig::new(
            RepoSlug::new("gitpod-io", "workspace-images"),
            InclusionPolicy::Merged,
        )
        .forced_to("workspace.images"),
        RepositoryConfig::new(
            RepoSlug::new("gitpod-io", "gitpod-vscode-desktop"),
            InclusionPolicy::Released,
        )
        .forced_to("vscode.desktop"),
    ]
}

/// Categories of the documentation site's changelog
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("VS Code", "vscode")
            .with_team("IDE")
            .with_prefixes(&["code"])
            .with_children(vec![
                Category::new("VS Code Browser", "browser")
                    .with_team("IDE")
                    .with_labels(&["editor: code (browser)"]),
                Category::new("VS Code Desktop", "desktop")
                    .with_team("IDE")
                    .with_labels(&["editor: code (desktop)"])
                    .with_order(DisplayOrder::Rank(1)),
            ]),
        Category::new("JetBrains", "jetbrains")
            .with_team("IDE")
            .with_labels(&["editor: jetbrains"])
            .with_prefixes(&["jb", "jetbrains"]),
        Category::new("Dashboard", "dashboard")
            .with_team("WebApp")
            .with_labels(&["component: dashboard", "component: server"])
            .with_prefixes(&["dashboard", "server"]),
        Category::new("Gitpod CLI", "cli")
            .with_team("IDE")
            .with_labels(&["component: gp cli"])
            .with_prefixes(&["gp-cli"]),
        Category::new("Docs", "docs")
            .with_team("DCS")
            .with_labels(&["section: docs-content"])
            .with_prefixes(&["docs"]),
        Category::new("Workspace", "workspace")
            .with_team("Workspace")
            .with_labels(&["team: workspace"])
            .with_children(vec![
                Category::new("Workspace Images", "images")
                    .with_team("Workspace")
                    .with_labels(&["feature: workspace-images"]),
            ]),
        Category::new("Fixes and improvements", "others").with_order(DisplayOrder::Last),
    ]
}

impl ChangelogConfig {
    /// Load the configuration
    ///
    /// Lookup order: the explicit path, `.changelog.toml` in the working
    /// directory, the user config file, then the built-in defaults. Fields
    /// missing from a file fall back to the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(),
        };

        let config = match path {
            Some(path) => Self::load_from(&path)?,
            None => {
                log_debug!("No configuration file found, using built-in defaults");
                Self::default()
            }
        };

        config.validate()?;
        log_debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Parse a configuration file without validating it
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Self = toml::from_str(&content).with_context(|| {
            format!(
                "Invalid configuration file format in {}. Please check it for syntax errors.",
                path.display()
            )
        })?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn discover() -> Option<PathBuf> {
        let project = PathBuf::from(PROJECT_CONFIG_FILENAME);
        if project.exists() {
            return Some(project);
        }
        Self::user_config_path().filter(|path| path.exists())
    }

    /// `<config dir>/docs-changelog/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("docs-changelog").join("config.toml"))
    }

    /// Check the category tree and every repository's settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        let forest = self.forest()?;

        let mut seen = Vec::new();
        for repository in &self.repositories {
            if seen.contains(&&repository.slug) {
                return Err(ConfigError::DuplicateRepository(repository.slug.clone()));
            }
            seen.push(&repository.slug);

            if let Some(path) = &repository.force_category
                && !forest.contains(path)
            {
                return Err(ConfigError::UnknownForcedCategory {
                    repo: repository.slug.clone(),
                    path: path.clone(),
                });
            }
            if let InclusionPolicy::Deployed { label, .. } = &repository.policy
                && label.trim().is_empty()
            {
                return Err(ConfigError::EmptyDeployLabel(repository.slug.clone()));
            }
        }
        Ok(())
    }

    /// A fresh, empty category forest
    pub fn forest(&self) -> Result<CategoryForest, ForestError> {
        CategoryForest::new(self.categories.clone())
    }

    /// The GitHub token from the configured environment variable
    pub fn token_from_env(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }
}

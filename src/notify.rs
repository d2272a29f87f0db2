//! Chat summary of a generated changelog
//!
//! Posts a Slack message listing how many PRs every category collected, so
//! owning teams can review their section before the release goes out.

use crate::dates::{describe_relative, month_name};
use crate::source::{PullRequestSource, SearchQuery};
use crate::types::{Category, CategoryForest, PullRequest, RepoSlug};
use crate::{log_debug, log_info};
use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

/// Environment variable holding the bot token
pub const SLACK_TOKEN_ENV: &str = "SLACK_BOT_TOKEN";
/// Environment variable overriding the configured channel
pub const SLACK_CHANNEL_ENV: &str = "SLACK_CHANNEL";

fn link(pr: &PullRequest) -> String {
    format!("<{}|#{}>", pr.url, pr.number)
}

fn links(prs: &[PullRequest]) -> String {
    prs.iter().map(link).collect::<Vec<_>>().join(", ")
}

/// All PRs of a category and its sub-categories, parent first
fn collected(category: &Category) -> Vec<PullRequest> {
    let mut prs = category.pull_requests.clone();
    for child in &category.children {
        prs.extend(child.pull_requests.iter().cloned());
    }
    prs
}

/// One line per regular category: name, team, PR count and links
fn category_lines(forest: &CategoryForest) -> Vec<String> {
    forest
        .categories()
        .iter()
        .filter(|category| !category.is_catch_all())
        .map(|category| {
            let prs = collected(category);
            format!(
                "*{}* (team {}) - {} PRs\n{}",
                category.name,
                category.team.as_deref().unwrap_or("unassigned"),
                prs.len(),
                links(&prs)
            )
        })
        .collect()
}

/// Branch the changelog PR of a month is opened from
pub fn changelog_branch(month: &str) -> String {
    format!("changelog/{}", month.to_lowercase())
}

/// The open changelog PR for `month` in the docs repository, if any
pub async fn find_changelog_pr(
    source: &dyn PullRequestSource,
    repo: &RepoSlug,
    month: &str,
) -> Result<Option<PullRequest>> {
    let query = SearchQuery::new(
        repo.clone(),
        format!("is:pr is:open head:{}", changelog_branch(month)),
    );
    let prs = source
        .search_pull_requests(&query)
        .await
        .with_context(|| format!("Failed to search {repo} for the changelog PR"))?;
    Ok(prs.into_iter().next())
}

/// Build the `chat.postMessage` payload for a filled forest
///
/// `changelog_pr_url` adds a link to the open changelog PR to the stats.
pub fn build_summary(
    forest: &CategoryForest,
    release_date: NaiveDate,
    today: NaiveDate,
    channel: &str,
    changelog_pr_url: Option<&str>,
) -> Result<Value> {
    let month = month_name(release_date.month())?;
    let mut stats = vec![
        format!(
            ":calendar: Releasing {}",
            describe_relative(release_date, today)
        ),
        format!(
            ":newspaper: {} PRs in total",
            forest.total_pull_requests()
        ),
    ];
    if let Some(url) = changelog_pr_url {
        stats.push(format!(":link: <{url}|Changelog PR>"));
    }

    let others = forest
        .categories()
        .iter()
        .find(|category| category.is_catch_all())
        .map(collected)
        .unwrap_or_default();

    Ok(json!({
        "channel": channel,
        "text": "Here's the changelog!",
        "blocks": [
            {
                "type": "header",
                "text": { "type": "plain_text", "text": format!("Changelog for {month}") }
            },
            {
                "type": "section",
                "text": { "type": "mrkdwn", "text": stats.join("\n") }
            },
            {
                "type": "section",
                "text": { "type": "mrkdwn", "text": category_lines(forest).join("\n") }
            },
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!(
                        ":bug: + {} *other PRs* (help us categorize them with component labels :pray:): {}",
                        others.len(),
                        links(&others)
                    )
                }
            }
        ]
    }))
}

#[derive(Deserialize, Debug)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Minimal Slack Web API client
pub struct SlackClient {
    client: Client,
    token: String,
}

impl SlackClient {
    pub fn new(token: &str) -> Self {
        Self {
            client: Client::new(),
            token: token.to_string(),
        }
    }

    /// Client from `SLACK_BOT_TOKEN`, `None` when unset
    pub fn from_env() -> Option<Self> {
        std::env::var(SLACK_TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty())
            .map(|token| Self::new(&token))
    }

    pub async fn post_message(&self, payload: &Value) -> Result<()> {
        log_debug!("Posting chat summary to {}", payload["channel"]);
        let response: SlackResponse = self
            .client
            .post(POST_MESSAGE_URL)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
            .context("Failed to reach Slack")?
            .error_for_status()
            .context("Slack rejected the request")?
            .json()
            .await
            .context("Failed to parse Slack response")?;

        if !response.ok {
            bail!(
                "Slack refused the message: {}",
                response.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        log_info!("Chat summary posted");
        Ok(())
    }
}

/// Channel to post to: `SLACK_CHANNEL` when set, otherwise the configured one
pub fn resolve_channel(configured: &str) -> String {
    std::env::var(SLACK_CHANNEL_ENV)
        .ok()
        .filter(|channel| !channel.trim().is_empty())
        .unwrap_or_else(|| configured.to_string())
}

use crate::changes::{self, DateWindow, PolicyContext, RepositoryBatch};
use crate::config::ChangelogConfig;
use crate::dates::{current_month_boundaries, format_date, month_name, parse_date, today_utc};
use crate::metadata::MetadataStore;
use crate::notify::{SlackClient, build_summary, find_changelog_pr, resolve_channel};
use crate::output::{ChangelogDocument, WriteOptions, WriteOutcome};
use crate::partials::FsPartialStore;
use crate::preview::{CommentAction, remove_comment, render_comment, upsert_comment};
use crate::source::{GitHubClient, PullRequestSource};
use crate::types::{CategoryForest, RepoSlug};
use crate::{log_debug, log_error, ui};
use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, NaiveDate};
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Args, Parser, Subcommand, crate_version};
use std::path::PathBuf;

const LOG_FILE: &str = "docs-changelog-debug.log";

/// CLI structure defining the available commands and global arguments
#[derive(Parser)]
#[command(
    author,
    version = crate_version!(),
    about = "Generate the monthly changelog from merged and deployed pull requests",
    long_about = "Collects pull requests with release notes from every configured repository, \
                  sorts them into changelog categories and writes <changelog_path>/<release-date>/index.md.",
    disable_version_flag = true,
    args_conflicts_with_subcommands = true,
    after_help = get_dynamic_help(),
    styles = get_styles(),
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub dates: DateArgs,

    /// Only print the PR section of the changelog (with --dry-run)
    #[arg(long = "only-prs", visible_alias = "onlyPrs")]
    pub only_prs: bool,

    /// Overwrite index.md from the template, dropping manual edits
    #[arg(long)]
    pub force: bool,

    /// GitHub token, defaults to the CHANGELOG_GITHUB_ACCESS_TOKEN environment variable
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Print results instead of writing files or posting messages
    #[arg(long = "dry-run", visible_alias = "dryRun", global = true)]
    pub dry_run: bool,

    /// Configuration file, defaults to .changelog.toml in the working directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug messages to a file
    #[arg(
        short = 'l',
        long = "log",
        global = true,
        help = "Log debug messages to a file"
    )]
    pub log: bool,

    /// Specify a custom log file path
    #[arg(
        long = "log-file",
        global = true,
        help = "Specify a custom log file path"
    )]
    pub log_file: Option<String>,

    /// Suppress non-essential output (spinners, greetings, etc.)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress non-essential output"
    )]
    pub quiet: bool,

    /// Display the version
    #[arg(
        short = 'v',
        long = "version",
        global = true,
        help = "Display the version"
    )]
    pub version: bool,
}

/// Release date and query window, all `YYYY-MM-DD`
#[derive(Args, Debug, Clone, Default)]
pub struct DateArgs {
    /// Release date, defaults to the last business day of the current month
    pub release_date: Option<String>,
    /// Start of the window, defaults to the first business day of the current month
    pub from: Option<String>,
    /// End of the window, defaults to the last business day of the current month
    pub to: Option<String>,
}

impl DateArgs {
    /// Fill in missing dates from the current month's business days
    pub fn resolve(&self, today: NaiveDate) -> Result<(NaiveDate, DateWindow)> {
        let (first, last) = current_month_boundaries(today)?;
        let parse = |value: Option<&String>, default: NaiveDate| -> Result<NaiveDate> {
            value.map_or(Ok(default), |raw| {
                parse_date(raw).with_context(|| format!("Invalid date argument '{raw}'"))
            })
        };

        let release_date = parse(self.release_date.as_ref(), last)?;
        let from = parse(self.from.as_ref(), first)?;
        let to = parse(self.to.as_ref(), last)?;
        if from > to {
            return Err(anyhow!(
                "Start date {} is after end date {}",
                format_date(from),
                format_date(to)
            ));
        }
        Ok((release_date, DateWindow::new(from, to)))
    }
}

/// Enumeration of available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Post a summary of the changelog to Slack
    #[command(
        about = "Post a changelog summary to Slack",
        long_about = "Collects the changelog like the default command does, then posts per-category PR counts to Slack. \
                      Needs SLACK_BOT_TOKEN; SLACK_CHANNEL overrides the configured channel. With --dry-run the message payload is printed instead."
    )]
    Summary {
        #[command(flatten)]
        dates: DateArgs,
    },

    /// Preview how a single PR will appear in the changelog
    #[command(
        about = "Preview the changelog entry of a pull request",
        long_about = "Renders the comment that explains how a pull request's release note and category were interpreted."
    )]
    Preview {
        /// Repository as owner/name
        repo: RepoSlug,
        /// Pull request number
        number: u64,
        /// Create or update the preview comment on the pull request
        #[arg(long)]
        post: bool,
    },
}

fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Magenta.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Green.on_default().bold())
        .placeholder(AnsiColor::Yellow.on_default())
        .valid(AnsiColor::Blue.on_default().bold())
        .invalid(AnsiColor::Red.on_default().bold())
        .error(AnsiColor::Red.on_default().bold())
}

/// Parse the command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

fn get_dynamic_help() -> String {
    "Examples:\n  \
     docs-changelog --dry-run\n  \
     docs-changelog 2022-10-31 2022-10-03 2022-10-31 --force\n  \
     docs-changelog summary --dry-run\n  \
     docs-changelog preview gitpod-io/gitpod 13376"
        .to_string()
}

/// Main function to parse arguments and handle the command
pub async fn main() -> Result<()> {
    let cli = parse_args();

    if cli.version {
        ui::print_version(crate_version!());
        return Ok(());
    }

    if cli.log {
        crate::logger::enable_logging();
        let log_file = cli.log_file.as_deref().unwrap_or(LOG_FILE);
        crate::logger::set_log_file(log_file)?;
    } else {
        crate::logger::disable_logging();
    }

    if cli.quiet {
        ui::set_quiet_mode(true);
    }

    let config = ChangelogConfig::load(cli.config.as_deref())?;
    let token = ensure_token(cli.token.as_deref(), &config)?;
    let client = GitHubClient::new(&token);

    match cli.command {
        Some(Commands::Summary { dates }) => handle_summary(&client, &config, &dates, cli.dry_run).await,
        Some(Commands::Preview { repo, number, post }) => {
            handle_preview(&client, &config, &repo, number, post).await
        }
        None => {
            let options = WriteOptions {
                force: cli.force,
                dry_run: cli.dry_run,
                only_prs: cli.only_prs,
            };
            handle_generate(&client, &config, &cli.dates, options).await
        }
    }
}

/// The token from `--token` or the environment, with instructions when missing
pub fn ensure_token(flag: Option<&str>, config: &ChangelogConfig) -> Result<String> {
    if let Some(token) = flag.filter(|token| !token.trim().is_empty()) {
        return Ok(token.to_string());
    }
    if let Some(token) = config.token_from_env() {
        return Ok(token);
    }

    ui::print_error(&format!(
        "Please provide a GitHub personal access token via a `{}` environment variable.",
        config.token_env
    ));
    ui::print_info(
        "Create a personal access token at https://github.com/settings/tokens/new?scopes=repo,user",
    );
    Err(anyhow!("Missing GitHub token"))
}

/// Everything a generate or summary run produced
pub struct CollectedChangelog {
    pub release_date: NaiveDate,
    pub forest: CategoryForest,
    pub batch: RepositoryBatch,
}

/// Greet, then collect every repository and file the results
pub async fn collect_changelog(
    source: &dyn PullRequestSource,
    config: &ChangelogConfig,
    dates: &DateArgs,
    dry_run: bool,
) -> Result<CollectedChangelog> {
    let (release_date, window) = dates.resolve(today_utc())?;
    log_debug!(
        "Release {} covering {}..{}",
        format_date(release_date),
        format_date(window.from),
        format_date(window.to)
    );

    let viewer = source
        .viewer()
        .await
        .context("Failed to verify the GitHub token")?;
    ui::print_greeting(viewer.display_name());

    let metadata = MetadataStore::new(&config.changelog_path).with_dry_run(dry_run);
    let context = PolicyContext {
        release_date,
        metadata: &metadata,
    };

    let spinner = ui::create_spinner(&format!(
        "Collecting pull requests from {} repositories",
        config.repositories.len()
    ));
    let result = changes::collect(
        source,
        &config.repositories,
        config.forest()?,
        window,
        &context,
    )
    .await;
    spinner.finish_and_clear();
    let (forest, batch) = result?;

    for warning in &batch.warnings {
        ui::print_warning(&warning.to_string());
    }
    for (number, name) in &batch.unknown_overrides {
        ui::print_warning(&format!("#{number} names unknown category '{name}'"));
    }

    Ok(CollectedChangelog {
        release_date,
        forest,
        batch,
    })
}

async fn handle_generate(
    source: &dyn PullRequestSource,
    config: &ChangelogConfig,
    dates: &DateArgs,
    options: WriteOptions,
) -> Result<()> {
    let collected = collect_changelog(source, config, dates, options.dry_run).await?;

    let partials = FsPartialStore::new(&config.changelog_path);
    let content = changes::assemble(
        &collected.forest,
        collected.release_date,
        &partials,
        &config.excluded_users,
    )?;

    let document = ChangelogDocument::new(&config.changelog_path, collected.release_date);
    match document.write(&content, options) {
        Ok(WriteOutcome::Preview(text)) => {
            ui::print_bordered_content(&text);
            Ok(())
        }
        Ok(WriteOutcome::Written(path)) => {
            ui::print_success(&format!(
                "Changelog generated. Please edit {}",
                path.display()
            ));
            Ok(())
        }
        Err(e) => {
            log_error!("Writing {} failed: {:#}", document.document_path().display(), e);
            ui::print_error(&format!("Error: {e:#}"));
            ui::print_info("\nPlease ensure the following:");
            ui::print_info(&format!(
                "1. {} exists, or the release directory already has an index.md.",
                document.template_path().display()
            ));
            ui::print_info(
                "2. The document contains the <!--- BEGIN_AUTOGENERATED_CHANGES --> and <!--- END_AUTOGENERATED_CHANGES --> markers.",
            );
            Err(e)
        }
    }
}

async fn handle_summary(
    source: &dyn PullRequestSource,
    config: &ChangelogConfig,
    dates: &DateArgs,
    dry_run: bool,
) -> Result<()> {
    let collected = collect_changelog(source, config, dates, dry_run).await?;
    let channel = resolve_channel(&config.slack_channel);
    let month = month_name(collected.release_date.month())?;
    let changelog_pr = find_changelog_pr(source, &config.changelog_repository, month)
        .await
        .unwrap_or_else(|e| {
            log_error!("Looking up the changelog PR failed: {:#}", e);
            None
        });
    let payload = build_summary(
        &collected.forest,
        collected.release_date,
        today_utc(),
        &channel,
        changelog_pr.as_ref().map(|pr| pr.url.as_str()),
    )?;

    if dry_run {
        ui::print_bordered_content(&serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let Some(slack) = SlackClient::from_env() else {
        ui::print_error("Missing Slack environment variable SLACK_BOT_TOKEN");
        return Err(anyhow!("Missing Slack token"));
    };
    slack.post_message(&payload).await?;
    ui::print_success(&format!("Summary posted to {channel}"));
    Ok(())
}

async fn handle_preview(
    client: &GitHubClient,
    config: &ChangelogConfig,
    repo: &RepoSlug,
    number: u64,
    post: bool,
) -> Result<()> {
    let pr = client
        .pull_request(repo, number)
        .await
        .with_context(|| format!("Failed to fetch {repo}#{number}"))?;
    let forest = config.forest()?;
    let policy = config
        .repositories
        .iter()
        .find(|repository| &repository.slug == repo)
        .map(|repository| &repository.policy);

    let Some(comment) = render_comment(&pr, repo, &forest, policy, &config.excluded_users) else {
        ui::print_info("No release note found");
        if post && remove_comment(client, repo, number).await? == CommentAction::Deleted {
            ui::print_success("Deleted stale preview comment");
        }
        return Ok(());
    };

    ui::print_bordered_content(&comment);
    if post {
        match upsert_comment(client, repo, number, &comment).await? {
            CommentAction::Created => ui::print_success("Created preview comment"),
            CommentAction::Updated => ui::print_success("Updated preview comment"),
            CommentAction::Unchanged | CommentAction::Deleted => {
                ui::print_info("Preview comment is already up to date");
            }
        }
    }
    Ok(())
}

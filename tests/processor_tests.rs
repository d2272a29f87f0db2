#![allow(clippy::unwrap_used)]

use docs_changelog::changes::{
    DateWindow, InclusionPolicy, PolicyContext, collect, process_repository,
};
use docs_changelog::config::RepositoryConfig;
use docs_changelog::metadata::MetadataStore;
use docs_changelog::source::ComparisonStatus;
use docs_changelog::types::CategoryPath;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

use test_utils::{FakeSource, PrBuilder, at, day, default_forest, slug};

const GITPOD: &str = "gitpod-io/gitpod";
const WEBSITE: &str = "gitpod-io/website";
const DESKTOP: &str = "gitpod-io/gitpod-vscode-desktop";

fn october() -> DateWindow {
    DateWindow::new(day(2022, 10, 3), day(2022, 10, 31))
}

fn numbers(batch: &docs_changelog::changes::RepositoryBatch) -> Vec<u64> {
    batch
        .assignments
        .iter()
        .map(|a| a.pull_request.number)
        .collect()
}

fn path(value: &str) -> CategoryPath {
    value.parse().unwrap()
}

fn deployed_policy() -> InclusionPolicy {
    InclusionPolicy::Deployed {
        label: "deployed".to_string(),
        lookback_days: 60,
        extra_qualifiers: "-label:release-note-none".to_string(),
    }
}

#[tokio::test]
async fn test_merged_policy_sorts_and_categorizes() {
    let temp_dir = TempDir::new().unwrap();
    let metadata = MetadataStore::new(temp_dir.path());
    let context = PolicyContext {
        release_date: day(2022, 10, 31),
        metadata: &metadata,
    };
    let source = FakeSource::default().with_pull_requests(
        WEBSITE,
        vec![
            PrBuilder::new(1, "[docs] Older")
                .note("Older docs")
                .merged_at(at(2022, 10, 4, 9))
                .build(),
            PrBuilder::new(2, "No note")
                .body("Just a description")
                .merged_at(at(2022, 10, 10, 9))
                .build(),
            PrBuilder::new(3, "Uncategorized")
                .note("Something else")
                .merged_at(at(2022, 10, 20, 9))
                .build(),
        ],
    );
    let repository = RepositoryConfig::new(slug(WEBSITE), InclusionPolicy::Merged);

    let batch = process_repository(&source, &repository, &default_forest(), october(), &context)
        .await
        .unwrap();

    assert_eq!(numbers(&batch), vec![3, 1]);
    assert_eq!(batch.assignments[0].path, path("others"));
    assert_eq!(batch.assignments[1].path, path("docs"));
    assert_eq!(batch.warnings.len(), 1, "[docs] prefix without the docs label");
    assert_eq!(
        source.recorded_queries(),
        vec!["repo:gitpod-io/website is:pr is:merged merged:2022-10-03..2022-10-31 sort:updated-desc"]
    );
}

#[tokio::test]
async fn test_forced_category_bypasses_matcher() {
    let temp_dir = TempDir::new().unwrap();
    let metadata = MetadataStore::new(temp_dir.path());
    let context = PolicyContext {
        release_date: day(2022, 10, 31),
        metadata: &metadata,
    };
    let source = FakeSource::default().with_pull_requests(
        "gitpod-io/workspace-images",
        vec![
            PrBuilder::new(10, "[jb] Looks like JetBrains")
                .labels(&["editor: jetbrains"])
                .note("Update Go image")
                .merged_at(at(2022, 10, 5, 9))
                .build(),
            PrBuilder::new(11, "No note").merged_at(at(2022, 10, 6, 9)).build(),
        ],
    );
    let repository = RepositoryConfig::new(slug("gitpod-io/workspace-images"), InclusionPolicy::Merged)
        .forced_to("workspace.images");

    let batch = process_repository(&source, &repository, &default_forest(), october(), &context)
        .await
        .unwrap();

    assert_eq!(numbers(&batch), vec![10]);
    assert_eq!(batch.assignments[0].path, path("workspace.images"));
    assert!(batch.warnings.is_empty());
}

#[tokio::test]
async fn test_unknown_forced_category_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let metadata = MetadataStore::new(temp_dir.path());
    let context = PolicyContext {
        release_date: day(2022, 10, 31),
        metadata: &metadata,
    };
    let source = FakeSource::default();
    let repository =
        RepositoryConfig::new(slug(WEBSITE), InclusionPolicy::Merged).forced_to("nope.missing");

    let result =
        process_repository(&source, &repository, &default_forest(), october(), &context).await;
    assert!(result.is_err());
    assert!(source.recorded_queries().is_empty());
}

#[tokio::test]
async fn test_deployed_policy_uses_last_deployment() {
    let temp_dir = TempDir::new().unwrap();
    let metadata = MetadataStore::new(temp_dir.path());
    let context = PolicyContext {
        release_date: day(2022, 10, 31),
        metadata: &metadata,
    };
    let source = FakeSource::default().with_pull_requests(
        GITPOD,
        vec![
            // deployed before the window only
            PrBuilder::new(1, "Early")
                .note("Early")
                .labeled("deployed", at(2022, 9, 28, 12))
                .build(),
            // rolled back and redeployed inside the window
            PrBuilder::new(2, "Redeployed")
                .note("Redeployed")
                .labeled("deployed", at(2022, 9, 28, 12))
                .labeled("deployed", at(2022, 10, 5, 12))
                .build(),
            // deployed inside, redeployed after the window
            PrBuilder::new(3, "Late")
                .note("Late")
                .labeled("deployed", at(2022, 10, 20, 12))
                .labeled("deployed", at(2022, 11, 1, 12))
                .build(),
            // last minute of the window
            PrBuilder::new(4, "Edge")
                .note("Edge")
                .labeled("deployed", at(2022, 10, 31, 23))
                .build(),
            PrBuilder::new(5, "Other label")
                .note("Other")
                .labeled("team: workspace", at(2022, 10, 10, 12))
                .build(),
        ],
    );
    let repository = RepositoryConfig::new(slug(GITPOD), deployed_policy());

    let batch = process_repository(&source, &repository, &default_forest(), october(), &context)
        .await
        .unwrap();

    assert_eq!(numbers(&batch), vec![4, 2]);
    assert_eq!(
        source.recorded_queries(),
        vec!["repo:gitpod-io/gitpod is:pr is:merged merged:2022-08-04..2022-10-31 sort:updated-desc label:deployed -label:release-note-none"]
    );
}

#[tokio::test]
async fn test_released_policy_compares_against_previous_release() {
    let temp_dir = TempDir::new().unwrap();
    let previous_dir = temp_dir.path().join("2022-09-30");
    fs::create_dir_all(&previous_dir).unwrap();
    fs::write(
        previous_dir.join("meta.json"),
        json!({ "repos": { DESKTOP: { "version": "v1.0.0" } } }).to_string(),
    )
    .unwrap();
    let metadata = MetadataStore::new(temp_dir.path());
    let context = PolicyContext {
        release_date: day(2022, 10, 31),
        metadata: &metadata,
    };

    let source = FakeSource::default()
        .with_pull_requests(
            DESKTOP,
            vec![
                PrBuilder::new(1, "Shipped")
                    .note("Shipped")
                    .merged_at(at(2022, 10, 10, 9))
                    .merge_commit("m1")
                    .build(),
                PrBuilder::new(2, "Already released")
                    .note("Old")
                    .merged_at(at(2022, 10, 4, 9))
                    .merge_commit("m2")
                    .build(),
                PrBuilder::new(3, "Not yet released")
                    .note("Unreleased")
                    .merged_at(at(2022, 10, 25, 9))
                    .merge_commit("m3")
                    .build(),
            ],
        )
        .with_latest_release(DESKTOP, "v1.1.0", "c-latest")
        .with_release("v1.0.0", "c-previous")
        .with_comparison("c-previous", "m1", ComparisonStatus::Ahead)
        .with_comparison("c-previous", "m3", ComparisonStatus::Ahead)
        .with_comparison("c-latest", "m3", ComparisonStatus::Ahead)
        .with_comparison("c-previous", "m2", ComparisonStatus::Behind);
    let repository =
        RepositoryConfig::new(slug(DESKTOP), InclusionPolicy::Released).forced_to("vscode.desktop");

    let batch = process_repository(&source, &repository, &default_forest(), october(), &context)
        .await
        .unwrap();

    assert_eq!(numbers(&batch), vec![1]);
    assert_eq!(batch.assignments[0].path, path("vscode.desktop"));

    let recorded = metadata.read(day(2022, 10, 31)).unwrap().unwrap();
    assert_eq!(recorded.repository_version(&slug(DESKTOP)), Some("v1.1.0"));
}

#[tokio::test]
async fn test_released_policy_without_previous_run() {
    let temp_dir = TempDir::new().unwrap();
    let metadata = MetadataStore::new(temp_dir.path()).with_dry_run(true);
    let context = PolicyContext {
        release_date: day(2022, 10, 31),
        metadata: &metadata,
    };
    let source = FakeSource::default()
        .with_pull_requests(
            DESKTOP,
            vec![
                PrBuilder::new(1, "Released")
                    .note("Released")
                    .merged_at(at(2022, 10, 10, 9))
                    .merge_commit("m1")
                    .build(),
                PrBuilder::new(2, "Too new")
                    .note("Too new")
                    .merged_at(at(2022, 10, 12, 9))
                    .merge_commit("m2")
                    .build(),
            ],
        )
        .with_latest_release(DESKTOP, "v1.1.0", "c-latest")
        .with_comparison("c-latest", "m2", ComparisonStatus::Ahead);
    let repository = RepositoryConfig::new(slug(DESKTOP), InclusionPolicy::Released);

    let batch = process_repository(&source, &repository, &default_forest(), october(), &context)
        .await
        .unwrap();

    assert_eq!(numbers(&batch), vec![1]);
    // dry run leaves the metadata alone
    assert!(metadata.read(day(2022, 10, 31)).unwrap().is_none());
}

#[tokio::test]
async fn test_repository_without_pull_requests_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let metadata = MetadataStore::new(temp_dir.path());
    let context = PolicyContext {
        release_date: day(2022, 10, 31),
        metadata: &metadata,
    };
    let source = FakeSource::default();
    let repository = RepositoryConfig::new(slug(DESKTOP), InclusionPolicy::Released);

    let batch = process_repository(&source, &repository, &default_forest(), october(), &context)
        .await
        .unwrap();
    assert!(batch.is_empty());
}

#[tokio::test]
async fn test_collect_folds_all_repositories() {
    let temp_dir = TempDir::new().unwrap();
    let metadata = MetadataStore::new(temp_dir.path());
    let context = PolicyContext {
        release_date: day(2022, 10, 31),
        metadata: &metadata,
    };
    let source = FakeSource::default()
        .with_pull_requests(
            GITPOD,
            vec![
                PrBuilder::new(1, "[code] Browser")
                    .labels(&["editor: code (browser)"])
                    .note("Browser")
                    .labeled("deployed", at(2022, 10, 5, 12))
                    .build(),
            ],
        )
        .with_pull_requests(
            WEBSITE,
            vec![
                PrBuilder::new(2, "Docs")
                    .labels(&["section: docs-content"])
                    .note("Docs")
                    .merged_at(at(2022, 10, 6, 9))
                    .build(),
            ],
        );
    let repositories = vec![
        RepositoryConfig::new(slug(GITPOD), deployed_policy()),
        RepositoryConfig::new(slug(WEBSITE), InclusionPolicy::Merged),
    ];

    let (forest, batch) = collect(&source, &repositories, default_forest(), october(), &context)
        .await
        .unwrap();

    assert_eq!(batch.assignments.len(), 2);
    assert_eq!(forest.total_pull_requests(), 2);
    assert_eq!(
        forest.get(&path("vscode.browser")).unwrap().pull_requests[0].number,
        1
    );
    assert!(forest.get(&path("vscode")).unwrap().pull_requests.is_empty());
    assert_eq!(forest.get(&path("docs")).unwrap().pull_requests[0].number, 2);
}

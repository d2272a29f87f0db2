use super::models::{
    CompareResponse, GraphQlResponse, PULL_REQUEST_FIELDS, RepositoryData, SearchData, ViewerData,
};
use super::{ComparisonStatus, PullRequestSource, Release, SearchQuery, SourceError, Viewer};
use crate::{log_debug, trace_debug};
use crate::types::{PullRequest, RepoSlug};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("docs-changelog/", env!("CARGO_PKG_VERSION"));
const SEARCH_PAGE_SIZE: u32 = 50;

/// A comment on an issue or pull request
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: String,
}

/// GitHub API client backed by `reqwest`
pub struct GitHubClient {
    client: Client,
    token: String,
    api_url: String,
}

impl GitHubClient {
    pub fn new(token: &str) -> Self {
        Self::with_api_url(token, DEFAULT_API_URL)
    }

    /// Point the client at another API root, e.g. a GitHub Enterprise host
    pub fn with_api_url(token: &str, api_url: &str) -> Self {
        Self {
            client: Client::new(),
            token: token.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
    }

    async fn execute(
        &self,
        builder: RequestBuilder,
        url: &str,
    ) -> Result<Response, SourceError> {
        let response = builder.send().await.map_err(|source| SourceError::Http {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        url: &str,
    ) -> Result<T, SourceError> {
        self.execute(builder, url)
            .await?
            .json::<T>()
            .await
            .map_err(|source| SourceError::Http {
                url: url.to_string(),
                source,
            })
    }

    async fn rest_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = format!("{}{path}", self.api_url);
        log_debug!("GET {}", url);
        self.send(self.request(Method::GET, &url), &url).await
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, SourceError> {
        let url = format!("{}/graphql", self.api_url);
        let body = json!({ "query": query, "variables": variables });
        trace_debug!(target: "docs_changelog::github", "POST {} with variables {}", url, body["variables"]);

        let response: GraphQlResponse<T> = self
            .send(self.request(Method::POST, &url).json(&body), &url)
            .await?;

        if !response.errors.is_empty() {
            let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(SourceError::GraphQl(messages.join("; ")));
        }
        response
            .data
            .ok_or_else(|| SourceError::MissingData("GraphQL data".to_string()))
    }

    pub async fn list_issue_comments(
        &self,
        repo: &RepoSlug,
        number: u64,
    ) -> Result<Vec<IssueComment>, SourceError> {
        self.rest_get(&format!(
            "/repos/{}/{}/issues/{number}/comments?per_page=100",
            repo.owner(),
            repo.name()
        ))
        .await
    }

    pub async fn create_issue_comment(
        &self,
        repo: &RepoSlug,
        number: u64,
        body: &str,
    ) -> Result<IssueComment, SourceError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{number}/comments",
            self.api_url,
            repo.owner(),
            repo.name()
        );
        log_debug!("POST {}", url);
        let request = self
            .request(Method::POST, &url)
            .json(&json!({ "body": body }));
        self.send(request, &url).await
    }

    pub async fn update_issue_comment(
        &self,
        repo: &RepoSlug,
        comment_id: u64,
        body: &str,
    ) -> Result<IssueComment, SourceError> {
        let url = format!(
            "{}/repos/{}/{}/issues/comments/{comment_id}",
            self.api_url,
            repo.owner(),
            repo.name()
        );
        log_debug!("PATCH {}", url);
        let request = self
            .request(Method::PATCH, &url)
            .json(&json!({ "body": body }));
        self.send(request, &url).await
    }

    /// Delete a comment, GitHub answers with an empty 204
    pub async fn delete_issue_comment(
        &self,
        repo: &RepoSlug,
        comment_id: u64,
    ) -> Result<(), SourceError> {
        let url = format!(
            "{}/repos/{}/{}/issues/comments/{comment_id}",
            self.api_url,
            repo.owner(),
            repo.name()
        );
        log_debug!("DELETE {}", url);
        self.execute(self.request(Method::DELETE, &url), &url)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    async fn viewer(&self) -> Result<Viewer, SourceError> {
        let data: ViewerData = self
            .graphql("query { viewer { login name } }", json!({}))
            .await?;
        Ok(data.viewer)
    }

    async fn search_pull_requests(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<PullRequest>, SourceError> {
        let graphql_query = format!(
            r"query($q: String!, $first: Int!, $cursor: String) {{
                search(query: $q, type: ISSUE, first: $first, after: $cursor) {{
                    nodes {{ ... on PullRequest {{ {PULL_REQUEST_FIELDS} }} }}
                    pageInfo {{ hasNextPage endCursor }}
                }}
            }}"
        );
        let search = query.to_query_string();
        let mut cursor: Option<String> = None;
        let mut pull_requests = Vec::new();

        loop {
            let data: SearchData = self
                .graphql(
                    &graphql_query,
                    json!({ "q": search, "first": SEARCH_PAGE_SIZE, "cursor": cursor }),
                )
                .await?;
            pull_requests.extend(data.search.nodes.into_iter().map(PullRequest::from));

            match data.search.page_info.end_cursor {
                Some(next) if data.search.page_info.has_next_page => cursor = Some(next),
                _ => break,
            }
        }

        log_debug!(
            "Search '{}' returned {} pull requests",
            search,
            pull_requests.len()
        );
        Ok(pull_requests)
    }

    async fn pull_request(
        &self,
        repo: &RepoSlug,
        number: u64,
    ) -> Result<PullRequest, SourceError> {
        let graphql_query = format!(
            r"query($owner: String!, $name: String!, $number: Int!) {{
                repository(owner: $owner, name: $name) {{
                    pullRequest(number: $number) {{ {PULL_REQUEST_FIELDS} }}
                }}
            }}"
        );
        let data: RepositoryData = self
            .graphql(
                &graphql_query,
                json!({ "owner": repo.owner(), "name": repo.name(), "number": number }),
            )
            .await?;
        data.repository
            .and_then(|repository| repository.pull_request)
            .map(PullRequest::from)
            .ok_or_else(|| SourceError::MissingData(format!("pull request {repo}#{number}")))
    }

    async fn latest_release(&self, repo: &RepoSlug) -> Result<Release, SourceError> {
        self.rest_get(&format!(
            "/repos/{}/{}/releases/latest",
            repo.owner(),
            repo.name()
        ))
        .await
    }

    async fn release_by_tag(&self, repo: &RepoSlug, tag: &str) -> Result<Release, SourceError> {
        self.rest_get(&format!(
            "/repos/{}/{}/releases/tags/{tag}",
            repo.owner(),
            repo.name()
        ))
        .await
    }

    async fn compare_commits(
        &self,
        repo: &RepoSlug,
        base: &str,
        head: &str,
    ) -> Result<ComparisonStatus, SourceError> {
        let comparison: CompareResponse = self
            .rest_get(&format!(
                "/repos/{}/{}/compare/{base}...{head}",
                repo.owner(),
                repo.name()
            ))
            .await?;
        comparison
            .status
            .parse()
            .map_err(|_| SourceError::UnknownComparison(comparison.status.clone()))
    }
}

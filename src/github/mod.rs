//! Thin authenticated client for the GitHub REST API
//!
//! Each method issues exactly one request and hands back the status code
//! and raw body. Deciding what counts as success is left to the caller.

pub mod models;

use crate::config::GithubConfig;
use crate::error::MCPError;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use url::Url;

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const GITHUB_API_VERSION_HEADER: &str = "x-github-api-version";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Status and body of a completed upstream call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Query string for `GET /repos/{owner}/{repo}/issues`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueListOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Comma-separated label names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// RFC 3339 timestamp in UTC
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
}

/// Query string for `GET /repos/{owner}/{repo}/pulls`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PullRequestListOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
}

/// JSON body for `POST /repos/{owner}/{repo}/issues`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u64>,
}

/// Shared, read-only handle to the GitHub API
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl GithubClient {
    /// Build a client from configuration
    pub fn new(config: &GithubConfig) -> Result<Self, MCPError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            MCPError::Config(format!("Invalid GitHub base URL {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(MCPError::Config(format!(
                "GitHub base URL {} cannot carry a path",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
        headers.insert(
            GITHUB_API_VERSION_HEADER,
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| MCPError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let token = Some(config.token.trim().to_string()).filter(|t| !t.is_empty());

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issues in a repository, pull requests included
    pub async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        options: &IssueListOptions,
    ) -> Result<ApiResponse, MCPError> {
        let url = self.endpoint(&["repos", owner, repo, "issues"])?;
        self.execute(self.request(Method::GET, url).query(options))
            .await
    }

    pub async fn get_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<ApiResponse, MCPError> {
        let number = number.to_string();
        let url = self.endpoint(&["repos", owner, repo, "issues", &number])?;
        self.execute(self.request(Method::GET, url)).await
    }

    pub async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        request: &IssueRequest,
    ) -> Result<ApiResponse, MCPError> {
        let url = self.endpoint(&["repos", owner, repo, "issues"])?;
        self.execute(self.request(Method::POST, url).json(request))
            .await
    }

    pub async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        options: &PullRequestListOptions,
    ) -> Result<ApiResponse, MCPError> {
        let url = self.endpoint(&["repos", owner, repo, "pulls"])?;
        self.execute(self.request(Method::GET, url).query(options))
            .await
    }

    /// Append escaped path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Result<Url, MCPError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| MCPError::Config(format!("Invalid GitHub base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<ApiResponse, MCPError> {
        let response = builder
            .send()
            .await
            .map_err(|e| MCPError::Http(format!("GitHub request failed: {}", e)))?;

        let status = response.status();
        debug!("GitHub {} -> {}", response.url(), status);

        let body = response
            .text()
            .await
            .map_err(|e| MCPError::Http(format!("Failed to read GitHub response body: {}", e)))?;

        Ok(ApiResponse { status, body })
    }
}

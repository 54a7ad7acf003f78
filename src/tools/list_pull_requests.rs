use super::{enum_property, non_empty, optional_count, repo_part, string_property, GithubTool};
use crate::error::MCPError;
use crate::github::models::PullRequest;
use crate::github::{ApiResponse, GithubClient, PullRequestListOptions};
use crate::schema::{Tool, ToolInputSchema};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

/// `list_pull_requests`: pull requests in a repository, filtered
pub struct ListPullRequests;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPullRequestsRequest {
    #[serde(deserialize_with = "repo_part")]
    pub owner: String,
    #[serde(deserialize_with = "repo_part")]
    pub repo: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub head: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default, deserialize_with = "optional_count")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "optional_count")]
    pub per_page: Option<u64>,
}

impl From<ListPullRequestsRequest> for PullRequestListOptions {
    fn from(request: ListPullRequestsRequest) -> Self {
        PullRequestListOptions {
            state: non_empty(request.state),
            head: non_empty(request.head),
            base: non_empty(request.base),
            sort: non_empty(request.sort),
            direction: non_empty(request.direction),
            page: request.page.filter(|p| *p != 0),
            per_page: request.per_page.filter(|p| *p != 0),
        }
    }
}

#[async_trait]
impl GithubTool for ListPullRequests {
    type Request = ListPullRequestsRequest;
    type Response = Vec<PullRequest>;

    const NAME: &'static str = "list_pull_requests";

    fn definition() -> Tool {
        let properties = BTreeMap::from([
            ("owner".to_string(), string_property("Repository owner")),
            ("repo".to_string(), string_property("Repository name")),
            (
                "state".to_string(),
                enum_property("Filter by state", &["open", "closed", "all"]),
            ),
            (
                "head".to_string(),
                string_property("Filter by head user/org and branch"),
            ),
            ("base".to_string(), string_property("Filter by base branch")),
            (
                "sort".to_string(),
                enum_property(
                    "Sort by",
                    &["created", "updated", "popularity", "long-running"],
                ),
            ),
            (
                "direction".to_string(),
                enum_property("Sort direction", &["asc", "desc"]),
            ),
            (
                "page".to_string(),
                json!({
                    "type": "number",
                    "description": "Page number for pagination (min 1)",
                    "minimum": 1
                }),
            ),
            (
                "perPage".to_string(),
                json!({
                    "type": "number",
                    "description": "Results per page for pagination (min 1, max 100)",
                    "minimum": 1
                }),
            ),
        ]);

        Tool {
            name: Self::NAME.to_string(),
            description: Some("List pull requests in a GitHub repository.".to_string()),
            input_schema: ToolInputSchema::object(properties, &["owner", "repo"]),
        }
    }

    async fn call(
        client: &GithubClient,
        request: ListPullRequestsRequest,
    ) -> Result<ApiResponse, MCPError> {
        let owner = request.owner.clone();
        let repo = request.repo.clone();
        client
            .list_pull_requests(&owner, &repo, &PullRequestListOptions::from(request))
            .await
    }
}

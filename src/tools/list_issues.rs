use super::{
    enum_property, non_empty, optional_count, parse_iso_timestamp, repo_part,
    string_array_property, string_property, GithubTool,
};
use crate::error::MCPError;
use crate::github::models::Issue;
use crate::github::{ApiResponse, GithubClient, IssueListOptions};
use crate::schema::{Tool, ToolInputSchema};
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

/// `list_issues`: issues in a repository, filtered
pub struct ListIssues;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListIssuesRequest {
    #[serde(deserialize_with = "repo_part")]
    pub owner: String,
    #[serde(deserialize_with = "repo_part")]
    pub repo: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default, deserialize_with = "optional_count")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "optional_count")]
    pub per_page: Option<u64>,
}

impl ListIssuesRequest {
    pub fn to_options(&self) -> Result<IssueListOptions, MCPError> {
        let since = match non_empty(self.since.clone()) {
            Some(since) => Some(
                parse_iso_timestamp(&since)?.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ),
            None => None,
        };

        Ok(IssueListOptions {
            state: non_empty(self.state.clone()),
            labels: self
                .labels
                .as_ref()
                .filter(|labels| !labels.is_empty())
                .map(|labels| labels.join(",")),
            sort: non_empty(self.sort.clone()),
            direction: non_empty(self.direction.clone()),
            since,
            page: self.page.filter(|p| *p != 0),
            per_page: self.per_page.filter(|p| *p != 0),
        })
    }
}

#[async_trait]
impl GithubTool for ListIssues {
    type Request = ListIssuesRequest;
    type Response = Vec<Issue>;

    const NAME: &'static str = "list_issues";

    fn definition() -> Tool {
        let properties = BTreeMap::from([
            ("owner".to_string(), string_property("Repository owner")),
            ("repo".to_string(), string_property("Repository name")),
            (
                "state".to_string(),
                enum_property("Filter by state", &["open", "closed", "all"]),
            ),
            ("labels".to_string(), string_array_property("Filter by labels")),
            (
                "sort".to_string(),
                enum_property("Sort order", &["created", "updated", "comments"]),
            ),
            (
                "direction".to_string(),
                enum_property("Sort direction", &["asc", "desc"]),
            ),
            (
                "since".to_string(),
                string_property("Filter by date (ISO 8601 timestamp)"),
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
                    "minimum": 1,
                    "maximum": 100
                }),
            ),
        ]);

        Tool {
            name: Self::NAME.to_string(),
            description: Some("List issues in a GitHub repository.".to_string()),
            input_schema: ToolInputSchema::object(properties, &["owner", "repo"]),
        }
    }

    async fn call(
        client: &GithubClient,
        request: ListIssuesRequest,
    ) -> Result<ApiResponse, MCPError> {
        let options = request.to_options()?;
        client
            .list_issues(&request.owner, &request.repo, &options)
            .await
    }
}

use super::{count, repo_part, string_property, GithubTool};
use crate::error::MCPError;
use crate::github::models::Issue;
use crate::github::{ApiResponse, GithubClient};
use crate::schema::{Tool, ToolInputSchema};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

/// `get_issue`: one issue by number
pub struct GetIssue;

#[derive(Debug, Clone, Deserialize)]
pub struct GetIssueRequest {
    #[serde(deserialize_with = "repo_part")]
    pub owner: String,
    #[serde(deserialize_with = "repo_part")]
    pub repo: String,
    #[serde(deserialize_with = "count")]
    pub issue_number: u64,
}

#[async_trait]
impl GithubTool for GetIssue {
    type Request = GetIssueRequest;
    type Response = Issue;

    const NAME: &'static str = "get_issue";

    fn definition() -> Tool {
        let properties = BTreeMap::from([
            (
                "owner".to_string(),
                string_property("The owner of the repository"),
            ),
            (
                "repo".to_string(),
                string_property("The name of the repository"),
            ),
            (
                "issue_number".to_string(),
                json!({"type": "number", "description": "The number of the issue"}),
            ),
        ]);

        Tool {
            name: Self::NAME.to_string(),
            description: Some(
                "Get details of a specific issue in a GitHub repository.".to_string(),
            ),
            input_schema: ToolInputSchema::object(properties, &["owner", "repo", "issue_number"]),
        }
    }

    async fn call(client: &GithubClient, request: GetIssueRequest) -> Result<ApiResponse, MCPError> {
        client
            .get_issue(&request.owner, &request.repo, request.issue_number)
            .await
    }
}

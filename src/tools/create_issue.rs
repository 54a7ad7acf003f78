use super::{count_or_zero, repo_part, string_array_property, string_property, GithubTool};
use crate::error::MCPError;
use crate::github::models::Issue;
use crate::github::{ApiResponse, GithubClient, IssueRequest};
use crate::schema::{Tool, ToolInputSchema};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

/// `create_issue`: open a new issue
pub struct CreateIssue;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIssueRequest {
    #[serde(deserialize_with = "repo_part")]
    pub owner: String,
    #[serde(deserialize_with = "repo_part")]
    pub repo: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assignees: Option<Vec<String>>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    /// Zero means no milestone
    #[serde(default, deserialize_with = "count_or_zero")]
    pub milestone: Option<u64>,
}

impl From<CreateIssueRequest> for IssueRequest {
    fn from(request: CreateIssueRequest) -> Self {
        IssueRequest {
            title: request.title,
            body: request.body,
            assignees: request.assignees,
            labels: request.labels,
            milestone: request.milestone,
        }
    }
}

#[async_trait]
impl GithubTool for CreateIssue {
    type Request = CreateIssueRequest;
    type Response = Issue;

    const NAME: &'static str = "create_issue";
    const SUCCESS: StatusCode = StatusCode::CREATED;

    fn definition() -> Tool {
        let properties = BTreeMap::from([
            ("owner".to_string(), string_property("Repository owner")),
            ("repo".to_string(), string_property("Repository name")),
            ("title".to_string(), string_property("Issue title")),
            ("body".to_string(), string_property("Issue body content")),
            (
                "assignees".to_string(),
                string_array_property("Usernames to assign to the issue"),
            ),
            (
                "labels".to_string(),
                string_array_property("Labels to apply to the issue"),
            ),
            (
                "milestone".to_string(),
                json!({"type": "number", "description": "Milestone number"}),
            ),
        ]);

        Tool {
            name: Self::NAME.to_string(),
            description: Some("Create a new issue in a GitHub repository.".to_string()),
            input_schema: ToolInputSchema::object(properties, &["owner", "repo", "title"]),
        }
    }

    async fn call(
        client: &GithubClient,
        request: CreateIssueRequest,
    ) -> Result<ApiResponse, MCPError> {
        let owner = request.owner.clone();
        let repo = request.repo.clone();
        client
            .create_issue(&owner, &repo, &IssueRequest::from(request))
            .await
    }
}

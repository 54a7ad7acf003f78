//! GitHub operations exposed as MCP tools
//!
//! Every tool follows the same shape: decode the call parameters into a
//! typed request, make exactly one GitHub call, then either re-encode the
//! returned entity or hand back the raw error body flagged with `isError`.

mod create_issue;
mod get_issue;
mod list_issues;
mod list_pull_requests;

pub use create_issue::{CreateIssue, CreateIssueRequest};
pub use get_issue::{GetIssue, GetIssueRequest};
pub use list_issues::{ListIssues, ListIssuesRequest};
pub use list_pull_requests::{ListPullRequests, ListPullRequestsRequest};

use crate::error::MCPError;
use crate::github::{ApiResponse, GithubClient};
use crate::schema::{CallToolResult, Tool};
use crate::server::Server;
use crate::transport::Transport;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use log::{debug, warn};
use reqwest::StatusCode;
use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// One GitHub operation exposed as a tool
#[async_trait]
pub trait GithubTool: Send + Sync + 'static {
    /// Decoded call parameters
    type Request: DeserializeOwned + Send;
    /// Entity GitHub returns on success
    type Response: DeserializeOwned + Serialize + Send;

    /// Tool name, unique within a server
    const NAME: &'static str;

    /// The only status treated as success
    const SUCCESS: StatusCode = StatusCode::OK;

    fn definition() -> Tool;

    /// Translate the request and perform the single upstream call
    async fn call(client: &GithubClient, request: Self::Request)
        -> Result<ApiResponse, MCPError>;
}

/// Run one invocation of tool `T`
pub async fn invoke<T: GithubTool>(
    client: &GithubClient,
    params: Value,
) -> Result<CallToolResult, MCPError> {
    let request: T::Request = serde_json::from_value(params)
        .map_err(|e| MCPError::InvalidParams(format!("{}: {}", T::NAME, e)))?;

    let response = T::call(client, request).await?;
    if response.status != T::SUCCESS {
        warn!(
            "{}: GitHub answered {} (expected {})",
            T::NAME,
            response.status,
            T::SUCCESS
        );
        return Ok(CallToolResult::error(response.body));
    }

    let entity: T::Response = serde_json::from_str(&response.body).map_err(|e| {
        MCPError::Deserialization(format!("{}: unexpected GitHub response: {}", T::NAME, e))
    })?;
    let text = serde_json::to_string(&entity)?;

    debug!("{}: returned {} bytes", T::NAME, text.len());
    Ok(CallToolResult::success(text))
}

/// Registers every GitHub tool with a server
pub struct Toolset;

impl Toolset {
    /// Definitions of every tool, in registration order
    pub fn definitions() -> Vec<Tool> {
        vec![
            ListIssues::definition(),
            GetIssue::definition(),
            CreateIssue::definition(),
            ListPullRequests::definition(),
        ]
    }

    pub fn register<T>(server: &mut Server<T>, client: GithubClient) -> Result<(), MCPError>
    where
        T: Transport + Send + Sync + Clone + 'static,
    {
        Self::add::<ListIssues, T>(server, &client)?;
        Self::add::<GetIssue, T>(server, &client)?;
        Self::add::<CreateIssue, T>(server, &client)?;
        Self::add::<ListPullRequests, T>(server, &client)?;
        Ok(())
    }

    fn add<G, T>(server: &mut Server<T>, client: &GithubClient) -> Result<(), MCPError>
    where
        G: GithubTool,
        T: Transport + Send + Sync + Clone + 'static,
    {
        let client = client.clone();
        server.register_tool(G::definition(), move |params: Value| {
            let client = client.clone();
            async move { invoke::<G>(&client, params).await }
        })
    }
}

/// Parse a `since` filter: RFC 3339 first, then a bare date at midnight UTC
pub fn parse_iso_timestamp(timestamp: &str) -> Result<DateTime<Utc>, MCPError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(timestamp, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .ok_or_else(|| {
            MCPError::InvalidParams(format!(
                "invalid ISO 8601 timestamp: {} (supported formats: YYYY-MM-DDThh:mm:ssZ or YYYY-MM-DD)",
                timestamp
            ))
        })
}

/// Drop empty strings so GitHub applies its own default
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn to_count(number: &Number) -> Result<u64, String> {
    if let Some(n) = number.as_u64() {
        return Ok(n);
    }
    match number.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
        _ => Err(format!("expected a non-negative integer, got {}", number)),
    }
}

/// Required count; accepts `3` and `3.0`
pub(crate) fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Number::deserialize(deserializer)?;
    to_count(&number).map_err(D::Error::custom)
}

/// Optional count; `null` counts as absent
pub(crate) fn optional_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Number>::deserialize(deserializer)?
        .map(|number| to_count(&number).map_err(D::Error::custom))
        .transpose()
}

/// Optional count where zero means "not set"
pub(crate) fn count_or_zero<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_count(deserializer)?.filter(|n| *n != 0))
}

/// Repository coordinate that must not be blank
pub(crate) fn repo_part<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.trim().is_empty() {
        return Err(D::Error::custom("must not be empty"));
    }
    Ok(value)
}

/// JSON schema for a string property
pub(crate) fn string_property(description: &str) -> Value {
    serde_json::json!({"type": "string", "description": description})
}

/// JSON schema for a string property limited to `values`
pub(crate) fn enum_property(description: &str, values: &[&str]) -> Value {
    serde_json::json!({"type": "string", "description": description, "enum": values})
}

/// JSON schema for an array of strings
pub(crate) fn string_array_property(description: &str) -> Value {
    serde_json::json!({"type": "array", "description": description, "items": {"type": "string"}})
}

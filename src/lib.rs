//! # GitHub tools for the Model Context Protocol
//!
//! This crate exposes a fixed set of GitHub repository operations as MCP
//! tools:
//!
//! - `list_issues`: list issues in a repository, with filters
//! - `get_issue`: fetch a single issue
//! - `create_issue`: open a new issue
//! - `list_pull_requests`: list pull requests in a repository, with filters
//!
//! It bundles the pieces needed to serve them:
//! - [`github`]: a thin authenticated client for the GitHub REST API
//! - [`tools`]: the tool adapters and the registry that wires them up
//! - [`server`]: an async MCP server that dispatches tool calls
//! - [`transport`]: stdio and Server-Sent Events transports
//! - [`schema`]: the MCP / JSON-RPC message types
//! - [`config`]: YAML configuration loading

pub mod config;
pub mod error;
pub mod github;
pub mod schema;
pub mod server;
pub mod tools;
pub mod transport;

// Re-export commonly used types
pub use error::MCPError;
pub use schema::json_rpc::{JSONRPCMessage, RequestId};
pub use schema::{CallToolResult, Tool};

/// Protocol version constants
pub mod constants {
    /// The latest supported MCP protocol version
    pub const LATEST_PROTOCOL_VERSION: &str = "2024-11-05";
    /// The JSON-RPC version used by MCP
    pub const JSONRPC_VERSION: &str = "2.0";
}

//! MCP message types
//!
//! Only the subset of the protocol this server speaks is modelled here:
//! JSON-RPC framing, tool definitions, and the initialize / tools results.

pub mod client;
pub mod common;
pub mod json_rpc;
pub mod server;

pub use client::{CallToolParams, ListToolsResult};
pub use common::{Implementation, TextContent, Tool, ToolInputSchema};
pub use json_rpc::{
    JSONRPCError, JSONRPCMessage, JSONRPCNotification, JSONRPCRequest, JSONRPCResponse, RequestId,
};
pub use server::{CallToolResult, InitializeResult, ServerCapabilities, ToolResultContent};

//! Asynchronous MCP host server
//!
//! The server accepts tool registrations (definition plus handler), speaks
//! JSON-RPC with a client through a [`Transport`], and dispatches
//! `tools/call` requests to the matching handler. Each tool call runs on its
//! own task, so handlers may be invoked concurrently.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mcp_github::{
//!     error::MCPError,
//!     schema::{CallToolResult, Tool, ToolInputSchema},
//!     server::{Server, ServerConfig},
//!     transport::stdio::StdioTransport,
//! };
//! use serde_json::{json, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), MCPError> {
//!     let mut server = Server::new(ServerConfig::new().with_name("echo"));
//!
//!     let tool = Tool {
//!         name: "echo".to_string(),
//!         description: Some("Echo a message".to_string()),
//!         input_schema: ToolInputSchema::object(
//!             [("message".to_string(), json!({"type": "string"}))].into(),
//!             &["message"],
//!         ),
//!     };
//!
//!     server.register_tool(tool, |params: Value| async move {
//!         let message = params
//!             .get("message")
//!             .and_then(|v| v.as_str())
//!             .ok_or_else(|| MCPError::InvalidParams("missing message".to_string()))?;
//!         Ok(CallToolResult::success(message))
//!     })?;
//!
//!     server.serve(StdioTransport::new()).await
//! }
//! ```

use crate::{
    constants::LATEST_PROTOCOL_VERSION,
    error::MCPError,
    schema::{
        client::{CallToolParams, ListToolsResult},
        common::{Implementation, Tool},
        json_rpc::{JSONRPCError, JSONRPCMessage, JSONRPCResponse, RequestId},
        server::{CallToolResult, InitializeResult, ServerCapabilities, ToolsCapability},
    },
    transport::Transport,
};
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// JSON-RPC error code for an unknown method
const METHOD_NOT_FOUND: i32 = -32601;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new() -> Self {
        Self {
            name: "MCP Server".to_string(),
            version: "1.0.0".to_string(),
        }
    }

    /// Set the server name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the server version
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Boxed future returned by a tool handler
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<CallToolResult, MCPError>> + Send>>;

/// Tool handler function type for async tool execution
///
/// `Ok` carries the tool's result, including results flagged as errors;
/// `Err` means the call could not be completed and is reported to the
/// client as a JSON-RPC error.
pub type AsyncToolHandler = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// High-level MCP server
#[derive(Clone)]
pub struct Server<T: Transport + Send + Sync> {
    config: ServerConfig,
    tools: Vec<Tool>,
    tool_handlers: Arc<Mutex<HashMap<String, AsyncToolHandler>>>,
    transport: Option<T>,
}

impl<T: Transport + Send + Sync + Clone + 'static> Server<T> {
    /// Create a new MCP server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            tools: Vec::new(),
            tool_handlers: Arc::new(Mutex::new(HashMap::new())),
            transport: None,
        }
    }

    /// Definitions of every registered tool, in registration order
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Register a tool definition together with its handler
    ///
    /// Fails if a tool with the same name is already registered.
    pub fn register_tool<F, Fut>(&mut self, tool: Tool, handler: F) -> Result<(), MCPError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResult, MCPError>> + Send + 'static,
    {
        if self.tools.iter().any(|t| t.name == tool.name) {
            return Err(MCPError::Protocol(format!(
                "Tool '{}' is already registered",
                tool.name
            )));
        }

        let async_handler: AsyncToolHandler = Arc::new(move |params| {
            let fut = handler(params);
            Box::pin(fut) as ToolFuture
        });

        let mut handlers = self.tool_handlers.try_lock().map_err(|_| {
            MCPError::Protocol("Failed to acquire lock on tool handlers".to_string())
        })?;
        handlers.insert(tool.name.clone(), async_handler);
        drop(handlers);

        debug!("Registered tool '{}'", tool.name);
        self.tools.push(tool);
        Ok(())
    }

    /// Start the server with the given transport
    ///
    /// Returns once the client sends `shutdown` or the transport closes.
    pub async fn serve(&mut self, mut transport: T) -> Result<(), MCPError> {
        transport.start().await?;
        self.transport = Some(transport);

        info!(
            "{} v{} serving {} tool(s)",
            self.config.name,
            self.config.version,
            self.tools.len()
        );

        self.process_messages().await
    }

    /// Process incoming messages
    ///
    /// Tool calls still running when the loop ends are awaited before the
    /// transport closes, so their responses are not lost.
    async fn process_messages(&mut self) -> Result<(), MCPError> {
        let mut tool_calls = JoinSet::new();

        loop {
            while let Some(finished) = tool_calls.try_join_next() {
                if let Err(e) = finished {
                    error!("Tool call task failed: {}", e);
                }
            }

            let message = {
                let transport = self
                    .transport
                    .as_mut()
                    .ok_or_else(|| MCPError::Protocol("Transport not initialized".to_string()))?;

                match transport.receive::<JSONRPCMessage>().await {
                    Ok(msg) => msg,
                    Err(MCPError::ConnectionClosed) => {
                        info!("Transport closed by peer");
                        break;
                    }
                    Err(e) => {
                        error!("Error receiving message: {}", e);
                        continue;
                    }
                }
            };

            match message {
                JSONRPCMessage::Request(request) => {
                    let id = request.id;
                    let method = request.method;
                    let params = request.params;

                    match method.as_str() {
                        "initialize" => {
                            info!("Received initialization request");
                            if let Err(e) = self.handle_initialize(id).await {
                                error!("Error handling initialize request: {}", e);
                            }
                        }
                        "tools/list" => {
                            debug!("Received tools list request");
                            if let Err(e) = self.handle_tools_list(id).await {
                                error!("Error handling tools/list request: {}", e);
                            }
                        }
                        "tools/call" => {
                            debug!("Received tools/call request");
                            let tools_call_task = self.clone_for_tools_call();

                            tool_calls.spawn(async move {
                                if let Err(e) = tools_call_task.handle_tools_call(id, params).await
                                {
                                    error!("Error handling tools/call request: {}", e);
                                }
                            });
                        }
                        "ping" => {
                            debug!("Received ping request");
                            if let Err(e) = self.send_result(id, json!({})).await {
                                error!("Error handling ping request: {}", e);
                            }
                        }
                        "shutdown" if self.shutdown_allowed() => {
                            info!("Received shutdown request");
                            if let Err(e) = self.send_result(id, json!({})).await {
                                error!("Error handling shutdown request: {}", e);
                            }
                            break;
                        }
                        _ => {
                            warn!("Unknown method: {}", method);
                            if let Err(e) = self
                                .send_error(id, METHOD_NOT_FOUND, format!("Method not found: {}", method))
                                .await
                            {
                                error!("Error sending error response: {}", e);
                            }
                        }
                    }
                }
                JSONRPCMessage::Notification(notification) => {
                    match notification.method.as_str() {
                        "notifications/initialized" | "initialized" => {
                            info!("Client initialization complete");
                        }
                        other => {
                            debug!("Received unknown notification: {}", other);
                        }
                    }
                }
                JSONRPCMessage::Response(_) | JSONRPCMessage::Error(_) => {
                    warn!("Ignoring unexpected response message from client");
                }
            }
        }

        if !tool_calls.is_empty() {
            info!("Waiting for {} tool call(s) to finish", tool_calls.len());
        }
        while let Some(finished) = tool_calls.join_next().await {
            if let Err(e) = finished {
                error!("Tool call task failed: {}", e);
            }
        }

        if let Some(transport) = self.transport.as_mut() {
            transport.close().await?;
        }

        Ok(())
    }

    /// A shared transport must not be stopped by one of its clients
    fn shutdown_allowed(&self) -> bool {
        self.transport
            .as_ref()
            .map_or(true, |transport| transport.supports_shutdown())
    }

    /// Create a handle for processing one tool call on its own task
    fn clone_for_tools_call(&self) -> ToolCallHandler<T> {
        ToolCallHandler {
            tool_handlers: self.tool_handlers.clone(),
            transport: self.transport.clone(),
        }
    }

    /// Handle initialization request
    async fn handle_initialize(&mut self, id: RequestId) -> Result<(), MCPError> {
        let capabilities = ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: Some(false),
            }),
            ..ServerCapabilities::default()
        };

        let init_result = InitializeResult {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            capabilities,
            server_info: Implementation {
                name: self.config.name.clone(),
                version: self.config.version.clone(),
            },
            instructions: None,
        };

        self.send_result(id, serde_json::to_value(init_result)?)
            .await
    }

    /// Handle tools list request
    async fn handle_tools_list(&mut self, id: RequestId) -> Result<(), MCPError> {
        let tools_list = ListToolsResult {
            next_cursor: None,
            tools: self.tools.clone(),
        };

        self.send_result(id, serde_json::to_value(tools_list)?)
            .await
    }

    async fn send_result(&mut self, id: RequestId, result: Value) -> Result<(), MCPError> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| MCPError::Protocol("Transport not initialized".to_string()))?;

        let response = JSONRPCResponse::new(id, result);
        transport.send(&JSONRPCMessage::Response(response)).await
    }

    /// Send an error response
    async fn send_error(&mut self, id: RequestId, code: i32, message: String) -> Result<(), MCPError> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| MCPError::Protocol("Transport not initialized".to_string()))?;

        let error = JSONRPCMessage::Error(JSONRPCError::new(id, code, message));
        transport.send(&error).await
    }
}

/// Handler struct for concurrent tool call processing
struct ToolCallHandler<T: Transport + Send + Sync> {
    tool_handlers: Arc<Mutex<HashMap<String, AsyncToolHandler>>>,
    transport: Option<T>,
}

impl<T: Transport + Send + Sync + Clone> ToolCallHandler<T> {
    /// Handle tools/call request concurrently
    async fn handle_tools_call(mut self, id: RequestId, params: Option<Value>) -> Result<(), MCPError> {
        let message = match self.call_tool(params).await {
            Ok(result) => {
                JSONRPCMessage::Response(JSONRPCResponse::new(id, serde_json::to_value(result)?))
            }
            Err(e) => {
                warn!("Tool call failed: {}", e);
                JSONRPCMessage::Error(JSONRPCError::new(id, e.rpc_code(), e.to_string()))
            }
        };

        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| MCPError::Protocol("Transport not initialized".to_string()))?;
        transport.send(&message).await
    }

    /// Decode the call parameters and run the named tool
    async fn call_tool(&self, params: Option<Value>) -> Result<CallToolResult, MCPError> {
        let params = params.ok_or_else(|| {
            MCPError::InvalidParams("Missing parameters in tools/call request".to_string())
        })?;

        let call_params: CallToolParams = serde_json::from_value(params)
            .map_err(|e| MCPError::InvalidParams(format!("Invalid tools/call parameters: {}", e)))?;

        let arguments = Value::Object(call_params.arguments.unwrap_or_default());
        self.execute_tool(&call_params.name, arguments).await
    }

    /// Execute a tool by name
    async fn execute_tool(&self, tool_name: &str, params: Value) -> Result<CallToolResult, MCPError> {
        let handler = {
            let handlers = self.tool_handlers.lock().await;
            handlers.get(tool_name).cloned()
        };

        match handler {
            Some(handler) => {
                debug!("Executing tool '{}'", tool_name);
                handler(params).await
            }
            None => Err(MCPError::InvalidParams(format!("Unknown tool: {}", tool_name))),
        }
    }
}

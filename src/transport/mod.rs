//! Transport layer for MCP communication

use crate::error::MCPError;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

pub mod sse;
pub mod stdio;

/// Callback invoked when a transport closes
pub type CloseCallback = Box<dyn Fn() + Send + Sync>;

/// Callback invoked when a transport hits an error
pub type ErrorCallback = Box<dyn Fn(&MCPError) + Send + Sync>;

/// Callback invoked with every raw message a transport reads
pub type MessageCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Async transport trait for MCP communication
#[async_trait]
pub trait Transport {
    /// Start processing messages
    async fn start(&mut self) -> Result<(), MCPError>;

    /// Send a message
    async fn send<T: Serialize + Send + Sync>(&mut self, message: &T) -> Result<(), MCPError>;

    /// Receive a message
    ///
    /// Returns [`MCPError::ConnectionClosed`] once the peer has gone away.
    async fn receive<T: DeserializeOwned + Send + Sync>(&mut self) -> Result<T, MCPError>;

    /// Close the connection
    ///
    /// Messages already handed to `send` are delivered before this returns.
    async fn close(&mut self) -> Result<(), MCPError>;

    /// Whether a peer's `shutdown` request may stop the server
    ///
    /// Transports shared by several clients return `false`.
    fn supports_shutdown(&self) -> bool {
        true
    }

    /// Set callback for when the connection is closed
    fn set_on_close(&mut self, callback: Option<CloseCallback>);

    /// Set callback for when an error occurs
    fn set_on_error(&mut self, callback: Option<ErrorCallback>);

    /// Set callback for when a message is received
    fn set_on_message<F>(&mut self, callback: Option<F>)
    where
        F: Fn(&str) + Send + Sync + 'static;
}

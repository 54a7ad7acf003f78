use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MCPError {
    #[error("JSON serialization error: {0}")]
    Serialization(String),

    #[error("JSON deserialization error: {0}")]
    Deserialization(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A tool call carried missing or malformed arguments
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// The request to the GitHub API could not be completed
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for MCPError {
    fn from(err: serde_json::Error) -> Self {
        MCPError::Serialization(err.to_string())
    }
}

impl MCPError {
    /// JSON-RPC error code reported to the peer for a failed tool call
    pub fn rpc_code(&self) -> i32 {
        match self {
            MCPError::InvalidParams(_) => -32602,
            _ => -32000,
        }
    }
}

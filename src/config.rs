//! Server configuration, loaded from a YAML file
//!
//! ```yaml
//! name: mcp-github
//! host: 0.0.0.0
//! port: 8080
//! transport: sse
//! github:
//!   token: ghp_xxx
//! ```

use crate::error::MCPError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Config file read when no `-f` flag is given
pub const DEFAULT_CONFIG_PATH: &str = "etc/mcp-github.yaml";

/// Environment variable consulted when the file has no token
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Default GitHub REST API endpoint
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// How the server talks to its MCP client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// HTTP with Server-Sent Events on `host:port`
    #[default]
    Sse,
    /// Newline-delimited JSON over stdin / stdout
    Stdio,
}

impl FromStr for TransportKind {
    type Err = MCPError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sse" => Ok(Self::Sse),
            "stdio" => Ok(Self::Stdio),
            other => Err(MCPError::Config(format!(
                "Unknown transport '{}' (expected sse or stdio)",
                other
            ))),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sse => write!(f, "sse"),
            Self::Stdio => write!(f, "stdio"),
        }
    }
}

/// GitHub API access
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default)]
    pub github: GithubConfig,
}

fn default_name() -> String {
    "mcp-github".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    DEFAULT_GITHUB_API_URL.to_string()
}

fn default_user_agent() -> String {
    concat!("mcp-github/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            host: default_host(),
            port: default_port(),
            transport: TransportKind::default(),
            github: GithubConfig::default(),
        }
    }
}

impl Config {
    /// Load the config file, filling an empty token from `GITHUB_TOKEN`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MCPError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MCPError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::from_yaml(&content)?;
        Ok(config.with_token_fallback(std::env::var(GITHUB_TOKEN_ENV).ok()))
    }

    /// Parse a YAML document
    pub fn from_yaml(content: &str) -> Result<Self, MCPError> {
        serde_yaml::from_str(content)
            .map_err(|e| MCPError::Config(format!("Invalid config: {}", e)))
    }

    /// Use `token` when the config does not already carry one
    pub fn with_token_fallback(mut self, token: Option<String>) -> Self {
        if self.github.token.is_empty() {
            if let Some(token) = token {
                self.github.token = token;
            }
        }
        self
    }

    /// URL the SSE transport binds to
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

//! MCP server exposing GitHub issues and pull requests as tools

use clap::Parser;
use log::info;
use mcp_github::{
    config::{Config, TransportKind, DEFAULT_CONFIG_PATH},
    error::MCPError,
    github::GithubClient,
    server::{Server, ServerConfig},
    tools::Toolset,
    transport::{sse::SSEServerTransport, stdio::StdioTransport, Transport},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML config file
    #[arg(short = 'f', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the transport from the config file (sse, stdio)
    #[arg(short, long)]
    transport: Option<TransportKind>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

async fn run<T>(config: &Config, client: GithubClient, transport: T) -> Result<(), MCPError>
where
    T: Transport + Send + Sync + Clone + 'static,
{
    let mut server = Server::new(
        ServerConfig::new()
            .with_name(&config.name)
            .with_version(env!("CARGO_PKG_VERSION")),
    );
    Toolset::register(&mut server, client)?;

    let names: Vec<&str> = server.tools().iter().map(|tool| tool.name.as_str()).collect();
    info!("Registered tools: {}", names.join(", "));

    server.serve(transport).await
}

#[tokio::main]
async fn main() -> Result<(), MCPError> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, default_filter),
    );

    let mut config = Config::load(&cli.config)?;
    if let Some(transport) = cli.transport {
        config.transport = transport;
    }

    let client = GithubClient::new(&config.github)?;
    info!(
        "Starting {} with {} transport against {}",
        config.name,
        config.transport,
        client.base_url()
    );

    match config.transport {
        TransportKind::Sse => {
            let transport = SSEServerTransport::new(&config.server_url())?;
            run(&config, client, transport).await
        }
        TransportKind::Stdio => run(&config, client, StdioTransport::new()).await,
    }
}

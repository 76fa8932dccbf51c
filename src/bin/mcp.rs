//! Standalone MCP server binary for Obsidian.
//!
//! Spawned by an MCP client (Claude Desktop, editors, ...) as a tool server.
//! It communicates:
//! - With the client via **stdio** (JSON-RPC 2.0)
//! - With Obsidian via the **Local REST API** plugin over HTTPS (or HTTP)
//!
//! Environment variables:
//! - `OBSIDIAN_API_KEY`: Local REST API key (required)
//! - `OBSIDIAN_USE_HTTP`: `true` to use the plain HTTP port
//! - `OBSIDIAN_HOST` / `OBSIDIAN_PORT`: override the API address
//! - `OBSIDIAN_MCP_LOG_LEVEL`: log level when `RUST_LOG` is unset

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use obsidian_mcp_tools::config::ServerConfig;
use obsidian_mcp_tools::mcp::handlers;
use obsidian_mcp_tools::mcp::server::{run_server, McpServerState};
use obsidian_mcp_tools::mcp::tools::{HandlerContext, SharedToolRegistry, ToolRegistry};
use obsidian_mcp_tools::services::logger;
use obsidian_mcp_tools::vault::VaultClient;

#[derive(Debug, Parser)]
#[command(name = "obsidian-mcp-tools", version, about)]
struct Args {
    /// Log level (trace, debug, info, warn, error). Overrides OBSIDIAN_MCP_LOG_LEVEL.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // The logger needs the config, so report on stderr directly.
            eprintln!("[MCP] {}", e);
            return Err(e.into());
        }
    };
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    if let Err(e) = logger::init(&config) {
        eprintln!("[MCP] Failed to initialize logging: {}", e);
    }

    if config.use_http {
        warn!("[MCP] Using plain HTTP for the Local REST API at {}", config.base_url());
    }

    let vault = VaultClient::new(&config).context("Failed to build Local REST API client")?;
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .context("Failed to build HTTP client")?;

    let mut registry = ToolRegistry::new();
    handlers::register_all(&mut registry).context("Failed to register tools")?;
    info!("[MCP] Registered {} tools", registry.list().len());

    let state = McpServerState::new(SharedToolRegistry::new(registry), HandlerContext::new(vault, http));
    if let Err(e) = run_server(state).await {
        error!("[MCP] Server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}

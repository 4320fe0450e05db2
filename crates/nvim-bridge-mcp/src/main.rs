//! nvim-bridge MCP server binary.
//!
//! Exposes running Neovim instances to MCP clients (Claude Code, Gemini CLI,
//! opencode). Start Neovim with a socket the bridge can find:
//!
//!   nvim --listen /tmp/nvim-$$.sock
//!
//! Usage:
//!   cargo run -p nvim-bridge-mcp
//!   cargo run -p nvim-bridge-mcp -- --socket-dir /run/user/1000 --call-timeout-ms 2000
//!
//! Test with MCP inspector:
//!   npx @modelcontextprotocol/inspector cargo run -p nvim-bridge-mcp

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rmcp::{ServiceExt, transport::stdio};
use tracing_subscriber::{EnvFilter, fmt};

use nvim_bridge_client::BridgeConfig;
use nvim_bridge_client::config::default_socket_dir;
use nvim_bridge_client::constants::{CALL_TIMEOUT, CONNECT_TIMEOUT, DEFAULT_SOCKET_PREFIX};
use nvim_bridge_mcp::NvimBridgeMcp;

/// MCP server exposing running Neovim instances.
#[derive(Parser, Debug)]
#[command(name = "nvim-bridge-mcp")]
#[command(about = "MCP server for driving running Neovim instances")]
struct Args {
    /// Directory scanned for <prefix>-<pid>.sock sockets (default: system temp dir)
    #[arg(long, env = "NVIM_BRIDGE_SOCKET_DIR")]
    socket_dir: Option<PathBuf>,

    /// Socket file name prefix
    #[arg(long, env = "NVIM_BRIDGE_SOCKET_PREFIX", default_value = DEFAULT_SOCKET_PREFIX)]
    socket_prefix: String,

    /// Deadline for each remote call, in milliseconds
    #[arg(long, env = "NVIM_BRIDGE_CALL_TIMEOUT_MS", default_value_t = CALL_TIMEOUT.as_millis() as u64)]
    call_timeout_ms: u64,

    /// Deadline for connecting to a socket, in milliseconds
    #[arg(long, env = "NVIM_BRIDGE_CONNECT_TIMEOUT_MS", default_value_t = CONNECT_TIMEOUT.as_millis() as u64)]
    connect_timeout_ms: u64,
}

impl Args {
    fn into_config(self) -> BridgeConfig {
        BridgeConfig {
            socket_dir: self.socket_dir.unwrap_or_else(default_socket_dir),
            socket_prefix: self.socket_prefix,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            call_timeout: Duration::from_millis(self.call_timeout_ms),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing to stderr (MCP uses stdio for protocol)
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = Args::parse().into_config();
    tracing::info!(
        socket_dir = %config.socket_dir.display(),
        prefix = %config.socket_prefix,
        call_timeout_ms = config.call_timeout.as_millis() as u64,
        "Starting nvim-bridge"
    );

    let service = NvimBridgeMcp::new(config)
        .serve(stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("MCP server error: {:?}", e);
        })?;

    tracing::info!("nvim-bridge-mcp server ready");

    service.waiting().await?;

    tracing::info!("nvim-bridge-mcp server shutting down");
    Ok(())
}

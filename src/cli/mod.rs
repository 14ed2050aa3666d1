//! CLI implementation for templated-mcp

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use templated_mcp::client::{ApiClient, DEFAULT_API_BASE};
use templated_mcp::config::Config;
use templated_mcp::mcp::{serve_http, serve_stdio, HttpOptions, McpServer, DEFAULT_OAUTH_ISSUER};
use templated_mcp::scope::Scope;

use config::apply_config_defaults;

const DEFAULT_BIND: &str = "0.0.0.0";

#[derive(Parser, Debug)]
#[command(name = "templated-mcp")]
#[command(about = "MCP server for the Templated image, video and PDF rendering API")]
#[command(version)]
pub struct Cli {
    /// Templated API key (HTTP callers may send their own instead)
    #[arg(long, env = "TEMPLATED_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Restrict templates to this folder; hides folder management tools
    #[arg(long, env = "TEMPLATED_FOLDER_ID")]
    folder_id: Option<String>,

    /// Restrict templates and renders to this external id
    #[arg(long, env = "TEMPLATED_EXTERNAL_ID")]
    external_id: Option<String>,

    /// Serve HTTP on this port instead of stdio
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Bind address for HTTP transport [default: 0.0.0.0]
    #[arg(long, env = "BIND")]
    bind: Option<String>,

    /// Base URL of the rendering API [default: https://api.templated.io]
    #[arg(long, env = "TEMPLATED_API_BASE")]
    api_base: Option<String>,

    /// OAuth issuer advertised at /.well-known/oauth-authorization-server
    #[arg(long, env = "TEMPLATED_OAUTH_ISSUER")]
    oauth_issuer: Option<String>,

    /// Token served at /.well-known/openai-apps-challenge
    #[arg(long, env = "OPENAI_APPS_CHALLENGE", hide_env_values = true)]
    challenge_token: Option<String>,

    /// Config file [default: ~/.config/templated-mcp/config.toml]
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Show debug info (sets RUST_LOG=debug)
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run with pre-parsed arguments (main.rs inspects `verbose` before tracing init)
pub fn run_with(mut cli: Cli) -> Result<()> {
    // CLI flags and env override the config file
    let config = Config::load(cli.config.as_deref());
    apply_config_defaults(&mut cli, config);

    let api_base = cli.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
    let client = ApiClient::new(api_base)?;
    let scope = Scope::new(
        cli.api_key.take(),
        cli.folder_id.take(),
        cli.external_id.take(),
    );
    tracing::debug!(scope = ?scope, api_base, "Default scope");
    let server = Arc::new(McpServer::new(client, scope));

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    match cli.port {
        Some(port) => {
            let options = HttpOptions {
                bind: cli.bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
                port,
                challenge_token: cli.challenge_token,
                oauth_issuer: cli
                    .oauth_issuer
                    .unwrap_or_else(|| DEFAULT_OAUTH_ISSUER.to_string()),
            };
            tracing::info!(bind = %options.bind, port, "Starting HTTP transport");
            rt.block_on(serve_http(server, options))
        }
        None => {
            if !server.default_scope().has_api_key() {
                tracing::warn!(
                    "No API key configured; tool calls will fail until TEMPLATED_API_KEY or --api-key is set"
                );
            }
            tracing::info!("Starting stdio transport");
            rt.block_on(serve_stdio(server))
        }
    }
}

//! # templated-mcp - MCP server for the Templated rendering API
//!
//! Exposes Templated's REST API (templates, renders, folders, uploads,
//! fonts, account) as Model Context Protocol tools, so an AI assistant can
//! design templates and render images, videos and PDFs through tool calls.
//!
//! ## Features
//!
//! - **Scoping**: pin a server (or a single HTTP request) to one folder
//!   and/or one external id. Both filters compose; a template must pass both.
//! - **Two transports**: stdio for local clients, stateless HTTP for hosted
//!   deployments with per-request API keys.
//! - **Discovery**: OAuth authorization server metadata and health check
//!   endpoints for hosted MCP clients.
//!
//! ## MCP Server
//!
//! ```no_run
//! use std::sync::Arc;
//! use templated_mcp::{ApiClient, McpServer, Scope};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ApiClient::new(templated_mcp::client::DEFAULT_API_BASE)?;
//! let scope = Scope::new(Some("tpl_key".into()), Some("folder-1".into()), None);
//! let server = Arc::new(McpServer::new(client, scope));
//!
//! // Stdio transport: runs until stdin closes
//! templated_mcp::serve_stdio(server).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod mcp;
pub mod scope;

pub use client::{ApiClient, RestCall};
pub use error::ToolError;
pub use mcp::{serve_http, serve_stdio, HttpOptions, McpServer};
pub use scope::{Scope, ScopeResolver};

//! MCP (Model Context Protocol) server implementation
//!
//! # Security
//!
//! JSON deserialization from untrusted input is bounded by:
//! - HTTP transport: 1MB request body limit (RequestBodyLimitLayer)
//! - Stdio transport: local subprocess client
//!
//! API keys arrive per request (HTTP) or at startup (stdio) and are only
//! ever forwarded to the rendering API as bearer tokens.

mod server;
mod tools;
mod transports;
mod types;

// Public API
pub use server::{McpServer, MCP_PROTOCOL_VERSION};
pub use tools::{
    call_tool, handle_tools_list, registry, visible_tools, ToolContext, ToolDef, ToolGroup,
};
pub use transports::{router, serve_http, serve_stdio, HttpOptions, DEFAULT_OAUTH_ISSUER};
pub use types::{CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, Tool};

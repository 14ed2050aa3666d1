//! MCP transport implementations
//!
//! Both transports serve the same [`McpServer`](super::McpServer); they
//! differ only in where the request scope comes from.

mod http;
mod stdio;

pub use http::{router, serve_http, HttpOptions, DEFAULT_OAUTH_ISSUER};
pub use stdio::serve_stdio;

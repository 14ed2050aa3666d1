//! MCP Server core implementation
//!
//! The McpServer handles JSON-RPC requests and coordinates tool execution.
//! It holds no per-caller state: the caller's [`Scope`] arrives with every
//! request and is dropped when the response is built.

use anyhow::Result;
use serde_json::Value;

use crate::client::ApiClient;
use crate::scope::Scope;

use super::tools::{self, ToolContext};
use super::types::{
    CallToolParams, InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ServerCapabilities, ServerInfo, ToolsCapability, INVALID_PARAMS, INVALID_REQUEST,
    METHOD_NOT_FOUND,
};

/// MCP protocol version
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

const INSTRUCTIONS: &str = "Tools for the Templated rendering API. Use list_templates to find a \
template, get_template_layers to see which layers can be overridden, then create_render to \
produce an image, video or PDF.";

/// MCP Server
///
/// Shared read-only across all concurrent requests; cloning the inner
/// client is cheap.
pub struct McpServer {
    client: ApiClient,
    default_scope: Scope,
}

impl McpServer {
    /// Create a server that calls the API at `client`'s base URL.
    ///
    /// `default_scope` is used as-is by stdio and as the fallback layer for
    /// per-request HTTP scopes.
    pub fn new(client: ApiClient, default_scope: Scope) -> Self {
        Self {
            client,
            default_scope,
        }
    }

    pub fn default_scope(&self) -> &Scope {
        &self.default_scope
    }

    /// Handle a JSON-RPC request under `scope`.
    ///
    /// Returns `None` for notifications, which get no response.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        scope: Scope,
    ) -> Option<JsonRpcResponse> {
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::failure(
                request.id,
                INVALID_REQUEST,
                "Invalid JSON-RPC version",
            ));
        }

        if request.is_notification() {
            match request.method.as_str() {
                "notifications/initialized" | "initialized" => {
                    tracing::debug!("MCP client initialized")
                }
                other => tracing::debug!(method = other, "Ignoring notification"),
            }
            return None;
        }

        let id = request.id;
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).map_or_else(
                |e| JsonRpcResponse::failure(id.clone(), INVALID_PARAMS, e.to_string()),
                |v| JsonRpcResponse::success(id.clone(), v),
            ),
            "ping" => JsonRpcResponse::success(id, Value::Object(Default::default())),
            "tools/list" => JsonRpcResponse::success(id, tools::handle_tools_list(&scope)),
            "tools/call" => self.handle_tools_call(id, request.params, scope).await,
            other => {
                tracing::debug!(method = other, "Unknown method");
                JsonRpcResponse::failure(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", other),
                )
            }
        };
        Some(response)
    }

    fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        // Bounded by the 1MB request body limit (HTTP) or the local client (stdio)
        let params: Option<InitializeParams> = params.map(serde_json::from_value).transpose()?;
        if let Some(params) = params {
            let (client, client_version) = params
                .client_info
                .map(|c| (c.name, c.version))
                .unwrap_or_default();
            tracing::info!(
                client = %client,
                client_version = %client_version,
                requested_version = params.protocol_version.as_deref().unwrap_or("none"),
                "MCP initialize"
            );
        }

        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: "templated-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            instructions: Some(INSTRUCTIONS.into()),
        };

        Ok(serde_json::to_value(result)?)
    }

    async fn handle_tools_call(
        &self,
        id: Option<Value>,
        params: Option<Value>,
        scope: Scope,
    ) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::failure(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid tools/call params: {}", e),
                )
            }
            None => return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params"),
        };

        let ctx = ToolContext::new(self.client.clone(), scope);
        let result = tools::call_tool(
            &ctx,
            &params.name,
            params.arguments.unwrap_or(Value::Null),
        )
        .await;

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::failure(id, INVALID_PARAMS, e.to_string()),
        }
    }
}

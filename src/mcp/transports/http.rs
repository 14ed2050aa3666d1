//! HTTP transport for MCP server
//!
//! Stateless Streamable HTTP transport. Every request derives its own
//! [`Scope`] from query parameters and headers layered over the process
//! defaults, so concurrent callers with different keys or folders never see
//! each other's scope.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{any, get},
    Json, Router,
};
use futures::stream;
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::scope::Scope;

use super::super::server::{McpServer, MCP_PROTOCOL_VERSION};
use super::super::types::{JsonRpcRequest, JsonRpcResponse, INVALID_REQUEST, PARSE_ERROR};

/// Default OAuth issuer advertised in the discovery document.
pub const DEFAULT_OAUTH_ISSUER: &str = "https://app.templated.io";

/// Protocol versions accepted in the `MCP-Protocol-Version` header.
const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &[MCP_PROTOCOL_VERSION, "2025-03-26", "2024-11-05"];

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub bind: String,
    pub port: u16,
    /// Served verbatim at `/.well-known/openai-apps-challenge`; 404 when unset.
    pub challenge_token: Option<String>,
    pub oauth_issuer: String,
}

struct HttpState {
    server: Arc<McpServer>,
    challenge_token: Option<String>,
    oauth_metadata: Value,
}

/// Per-request scope overrides. Both camelCase and snake_case are accepted.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScopeParams {
    #[serde(rename = "apiKey", alias = "api_key")]
    api_key: Option<String>,
    #[serde(rename = "folderId", alias = "folder_id")]
    folder_id: Option<String>,
    #[serde(rename = "externalId", alias = "external_id")]
    external_id: Option<String>,
}

/// Build the axum router: MCP endpoints, discovery documents, health.
pub fn router(server: Arc<McpServer>, options: &HttpOptions) -> Router {
    let state = Arc::new(HttpState {
        server,
        challenge_token: options
            .challenge_token
            .clone()
            .filter(|t| !t.trim().is_empty()),
        oauth_metadata: oauth_metadata(&options.oauth_issuer),
    });

    // Browser-based MCP clients call from arbitrary origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Body limit outermost: cors needs a response body that implements Default
    let middleware = ServiceBuilder::new()
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http());

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/.well-known/oauth-authorization-server",
            get(handle_oauth_metadata),
        )
        .route(
            "/.well-known/openai-apps-challenge",
            get(handle_challenge),
        )
        .route("/mcp", any(handle_mcp))
        .route("/sse", any(handle_mcp))
        .route("/", any(handle_mcp))
        .fallback(handle_not_found)
        .layer(middleware)
        .with_state(state)
}

/// Run the MCP server with HTTP transport until Ctrl-C.
pub async fn serve_http(server: Arc<McpServer>, options: HttpOptions) -> Result<()> {
    let app = router(server, &options);
    let addr = format!("{}:{}", options.bind, options.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        addr = %addr,
        protocol_version = MCP_PROTOCOL_VERSION,
        "MCP HTTP server listening"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutting down HTTP server");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;
    Ok(())
}

// ============================================================================
// Scope derivation
// ============================================================================

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Scope for one request. API key: `apiKey` query parameter, then bearer
/// header, then the process default. Folder and external id: query
/// parameter, then the process default.
pub(crate) fn request_scope(defaults: &Scope, params: ScopeParams, headers: &HeaderMap) -> Scope {
    let api_key = params
        .api_key
        .filter(|k| !k.trim().is_empty())
        .or_else(|| bearer_token(headers));
    defaults.overlay(api_key, params.folder_id, params.external_id)
}

// ============================================================================
// Discovery + health
// ============================================================================

/// OAuth 2.0 authorization server metadata (RFC 8414) pointing at the
/// rendering service's own OAuth endpoints.
fn oauth_metadata(issuer: &str) -> Value {
    let issuer = issuer.trim_end_matches('/');
    json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{}/oauth/authorize", issuer),
        "token_endpoint": format!("{}/oauth/token", issuer),
        "registration_endpoint": format!("{}/oauth/register", issuer),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "code_challenge_methods_supported": ["S256"],
        "token_endpoint_auth_methods_supported": ["none", "client_secret_post"],
        "scopes_supported": ["api"],
    })
}

async fn handle_health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "mode": "http",
        "service": "templated-mcp",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn handle_oauth_metadata(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(state.oauth_metadata.clone())
}

async fn handle_challenge(State(state): State<Arc<HttpState>>) -> Response {
    match &state.challenge_token {
        Some(token) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            token.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn handle_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"})))
}

// ============================================================================
// MCP endpoint
// ============================================================================

fn rpc_error(status: StatusCode, code: i32, message: impl Into<String>) -> Response {
    let body = JsonRpcResponse::failure(None, code, message);
    match serde_json::to_value(&body) {
        Ok(value) => (status, Json(value)).into_response(),
        Err(_) => status.into_response(),
    }
}

/// Check the optional `MCP-Protocol-Version` header.
fn check_protocol_version(headers: &HeaderMap) -> Result<(), Response> {
    let Some(version) = headers.get("mcp-protocol-version") else {
        return Ok(());
    };
    let version = version.to_str().unwrap_or("");
    if version.is_empty() || SUPPORTED_PROTOCOL_VERSIONS.contains(&version) {
        return Ok(());
    }
    Err(rpc_error(
        StatusCode::BAD_REQUEST,
        INVALID_REQUEST,
        format!(
            "Unsupported protocol version: {}. Supported: {}",
            version,
            SUPPORTED_PROTOCOL_VERSIONS.join(", ")
        ),
    ))
}

/// ANY /mcp, /sse, / - JSON-RPC over POST, SSE over GET
async fn handle_mcp(
    State(state): State<Arc<HttpState>>,
    method: Method,
    params: Result<Query<ScopeParams>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(response) = check_protocol_version(&headers) {
        return response;
    }

    match method {
        Method::POST => {
            let params = match params {
                Ok(Query(params)) => params,
                Err(rejection) => {
                    return rpc_error(
                        StatusCode::BAD_REQUEST,
                        INVALID_REQUEST,
                        format!("Invalid query string: {}", rejection.body_text()),
                    )
                }
            };
            let scope = request_scope(state.server.default_scope(), params, &headers);
            handle_rpc(&state.server, scope, &body).await
        }
        Method::GET => handle_sse(&headers),
        _ => (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET, POST")],
        )
            .into_response(),
    }
}

async fn handle_rpc(server: &McpServer, scope: Scope, body: &[u8]) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => {
            return rpc_error(
                StatusCode::BAD_REQUEST,
                PARSE_ERROR,
                format!("Parse error: {}", e),
            )
        }
    };

    tracing::debug!(method = %request.method, scope = ?scope, "MCP HTTP request");

    match server.handle_request(request, scope).await {
        None => StatusCode::ACCEPTED.into_response(),
        Some(response) => match serde_json::to_value(&response) {
            Ok(value) => (StatusCode::OK, Json(value)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
    }
}

/// GET - priming SSE stream. There are no server-initiated messages, so the
/// stream carries one event and then keep-alives.
fn handle_sse(headers: &HeaderMap) -> Response {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !accept.contains("text/event-stream") {
        return rpc_error(
            StatusCode::NOT_ACCEPTABLE,
            INVALID_REQUEST,
            "Accept header must include text/event-stream",
        );
    }

    let event_id = uuid::Uuid::new_v4().simple().to_string();
    let stream = stream::once(async move {
        Ok::<_, Infallible>(Event::default().id(event_id).data(""))
    });

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keep-alive"),
        )
        .into_response()
}

//! HTTP transport integration tests
//!
//! Drives the axum router in-process with `oneshot`; the rendering API is an
//! httpmock server.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use httpmock::prelude::*;
use serde_json::{json, Value};
use tower::ServiceExt;

use templated_mcp::mcp::{router, HttpOptions, DEFAULT_OAUTH_ISSUER};
use templated_mcp::{ApiClient, McpServer, Scope};

fn app(mock: &MockServer, defaults: Scope) -> axum::Router {
    let server = Arc::new(McpServer::new(
        ApiClient::new(&mock.base_url()).unwrap(),
        defaults,
    ));
    router(
        server,
        &HttpOptions {
            bind: "127.0.0.1".into(),
            port: 0,
            challenge_token: None,
            oauth_issuer: DEFAULT_OAUTH_ISSUER.into(),
        },
    )
}

fn tools_call(uri: &str, name: &str, arguments: Value) -> Request<Body> {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    });
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_oauth_metadata_document() {
    let mock = MockServer::start_async().await;
    let response = app(&mock, Scope::default())
        .oneshot(
            Request::get("/.well-known/oauth-authorization-server")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let doc = json_body(response).await;
    assert_eq!(doc["issuer"], DEFAULT_OAUTH_ISSUER);
    for field in [
        "authorization_endpoint",
        "token_endpoint",
        "registration_endpoint",
        "response_types_supported",
        "grant_types_supported",
        "code_challenge_methods_supported",
        "token_endpoint_auth_methods_supported",
        "scopes_supported",
    ] {
        assert!(!doc[field].is_null(), "missing {}", field);
    }
}

#[tokio::test]
async fn test_query_params_set_key_and_folder() {
    let mock = MockServer::start_async().await;
    let listing = mock
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/folder/f-req/templates")
                .header("authorization", "Bearer req-key");
            then.status(200).json_body(json!([{"id": "t-req"}]));
        })
        .await;

    let response = app(&mock, Scope::default())
        .oneshot(tools_call(
            "/mcp?apiKey=req-key&folderId=f-req",
            "list_templates",
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    listing.assert_async().await;
    assert!(body["result"]["isError"].is_null());
    assert!(body["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("t-req"));
}

#[tokio::test]
async fn test_bearer_header_supplies_key() {
    let mock = MockServer::start_async().await;
    let account = mock
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/account")
                .header("authorization", "Bearer header-key");
            then.status(200).json_body(json!({"plan": "pro"}));
        })
        .await;

    let mut request = tools_call("/mcp", "get_account", json!({}));
    request
        .headers_mut()
        .insert("authorization", "Bearer header-key".parse().unwrap());
    let response = app(&mock, Scope::new(Some("env-key".into()), None, None))
        .oneshot(request)
        .await
        .unwrap();

    let body = json_body(response).await;
    account.assert_async().await;
    assert!(body["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("pro"));
}

#[tokio::test]
async fn test_process_default_key_used_when_request_has_none() {
    let mock = MockServer::start_async().await;
    let account = mock
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/account")
                .header("authorization", "Bearer env-key");
            then.status(200).json_body(json!({"plan": "free"}));
        })
        .await;

    let response = app(&mock, Scope::new(Some("env-key".into()), None, None))
        .oneshot(tools_call("/", "get_account", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    account.assert_async().await;
}

#[tokio::test]
async fn test_no_key_anywhere_is_tool_error() {
    let mock = MockServer::start_async().await;
    let response = app(&mock, Scope::default())
        .oneshot(tools_call("/sse", "get_account", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["result"]["isError"], true);
}

#[tokio::test]
async fn test_request_scope_does_not_leak_between_requests() {
    let mock = MockServer::start_async().await;
    let app = app(&mock, Scope::new(Some("env-key".into()), None, None));
    let list = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"});

    let scoped = app
        .clone()
        .oneshot(
            Request::post("/mcp?folderId=f1")
                .body(Body::from(list.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let scoped = json_body(scoped).await;

    let unscoped = app
        .oneshot(
            Request::post("/mcp")
                .body(Body::from(list.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let unscoped = json_body(unscoped).await;

    let has_folders = |body: &Value| {
        body["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .any(|t| t["name"] == "list_folders")
    };
    assert!(!has_folders(&scoped));
    assert!(has_folders(&unscoped));
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let mock = MockServer::start_async().await;
    let huge = "x".repeat(2 * 1024 * 1024);
    let response = app(&mock, Scope::default())
        .oneshot(Request::post("/mcp").body(Body::from(huge)).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

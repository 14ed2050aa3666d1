//! Stdio transport for MCP server
//!
//! Reads newline-delimited JSON-RPC requests from stdin and writes responses
//! to stdout. Used when the server is launched as a local subprocess by an
//! MCP client.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use super::super::server::McpServer;
use super::super::types::{JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};

/// Run the MCP server with stdio transport
///
/// Every request line is handled on its own task, so one slow tool call does
/// not hold up the next. Responses are funnelled through a single writer
/// task so lines are never interleaved. Returns when stdin closes and all
/// in-flight requests have been answered.
pub async fn serve_stdio(server: Arc<McpServer>) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let server = Arc::clone(&server);
        let tx = tx.clone();
        tokio::spawn(async move {
            let Some(response) = handle_line(&server, &line).await else {
                return;
            };
            match serde_json::to_string(&response) {
                Ok(json) => {
                    if tx.send(json).is_err() {
                        tracing::warn!("stdout writer closed, dropping response");
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to serialize response"),
            }
        });
    }

    tracing::debug!("stdin closed, draining in-flight requests");
    drop(tx);
    writer.await.context("stdout writer task failed")??;
    Ok(())
}

/// Parse and dispatch one input line under the server's default scope.
pub(crate) async fn handle_line(server: &McpServer, line: &str) -> Option<JsonRpcResponse> {
    // Local subprocess client; line length is whatever the client sends
    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(req) => req,
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable stdin line");
            return Some(JsonRpcResponse::failure(
                None,
                PARSE_ERROR,
                format!("Parse error: {}", e),
            ));
        }
    };

    server
        .handle_request(request, server.default_scope().clone())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiClient;
    use crate::scope::Scope;

    fn server(scope: Scope) -> McpServer {
        McpServer::new(ApiClient::new("http://127.0.0.1:9").unwrap(), scope)
    }

    #[tokio::test]
    async fn test_garbage_line_is_parse_error() {
        let resp = handle_line(&server(Scope::default()), "{not json")
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);
        assert!(resp.id.is_none());
    }

    #[tokio::test]
    async fn test_initialized_notification_silent() {
        let resp = handle_line(
            &server(Scope::default()),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )
        .await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn test_uses_startup_scope() {
        let scoped = server(Scope::new(Some("k".into()), Some("f1".into()), None));
        let resp = handle_line(&scoped, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = resp.result.unwrap();
        let names: Vec<&str> = tools["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert!(!names.contains(&"list_folders"));
        assert!(names.contains(&"get_template"));
    }
}

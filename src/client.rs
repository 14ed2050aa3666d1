//! HTTP client for the downstream rendering API.
//!
//! Every tool call turns into one or more [`RestCall`]s executed here with the
//! caller's API key as a bearer token. The client holds no per-caller state, so
//! one instance is shared across all requests.

use anyhow::Context;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Method, Url};
use serde_json::{json, Value};

use crate::error::{Result, ToolError};

/// Production API base.
pub const DEFAULT_API_BASE: &str = "https://api.templated.io";

/// Characters escaped when an id is spliced into a path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Escape a caller-supplied id for use as one path segment.
pub fn segment(id: &str) -> String {
    utf8_percent_encode(id, PATH_SEGMENT).to_string()
}

/// A single downstream request, fully determined by tool arguments + scope.
#[derive(Debug, Clone, PartialEq)]
pub struct RestCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}

impl RestCall {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Append `key=value` only when the value is present.
    pub fn with_optional_query<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.with_query(key, v),
            None => self,
        }
    }

    /// Query value for `key`, if set. Mostly useful in tests.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Bearer-authenticated JSON client for the rendering API.
///
/// Cheap to clone: `reqwest::Client` is reference counted internally.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url` (trailing slash ignored).
    ///
    /// No request timeout is configured: a hung downstream call stalls only
    /// the tool call awaiting it.
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("templated-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        // Validate once up front so per-call URL joins can't fail on the base
        Url::parse(base_url).with_context(|| format!("Invalid API base URL: {}", base_url))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, call: &RestCall) -> Result<Url> {
        check_path(&call.path)?;
        let raw = format!("{}{}", self.base_url, call.path);
        let mut url = Url::parse(&raw).map_err(|e| {
            ToolError::InvalidArguments(format!("bad request path {}: {}", call.path, e))
        })?;
        if !call.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &call.query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Execute `call` with `api_key` as bearer token.
    ///
    /// Empty success bodies normalise to `{"success": true}`. Non-2xx
    /// responses become [`ToolError::Api`] carrying status and raw body.
    pub async fn execute(&self, api_key: &str, call: &RestCall) -> Result<Value> {
        let url = self.url_for(call)?;
        let start = std::time::Instant::now();

        let mut request = self
            .http
            .request(call.method.clone(), url)
            .bearer_auth(api_key);
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        tracing::debug!(
            method = %call.method,
            path = %call.path,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "API call completed"
        );

        if !status.is_success() {
            tracing::warn!(
                method = %call.method,
                path = %call.path,
                status = status.as_u16(),
                "API call failed"
            );
            return Err(ToolError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(decode_body(&text))
    }
}

/// Reject paths whose segments would be dropped or collapsed by URL
/// normalisation (`/v1/template/..` resolves to `/v1/`).
fn check_path(path: &str) -> Result<()> {
    for raw in path.split('/').skip(1) {
        let decoded = percent_decode_str(raw).decode_utf8_lossy();
        if matches!(decoded.as_ref(), "" | "." | "..") {
            return Err(ToolError::InvalidArguments(format!(
                "invalid id in request path {}",
                path
            )));
        }
    }
    Ok(())
}

/// Decode a success body. Non-JSON text is passed through as a string.
fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return json!({ "success": true });
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

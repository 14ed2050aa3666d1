//! Request scope: API key plus optional folder / external-id boundary.
//!
//! A [`Scope`] is an immutable value derived once per request (HTTP) or once
//! per process (stdio) and handed down to every downstream call that request
//! makes. Two concurrent HTTP callers therefore never observe each other's key
//! or boundary.
//!
//! Folder and external-id scoping are independent filters. When both are set
//! a template must satisfy both.

use std::fmt;

use serde_json::{json, Value};

use crate::client::{segment, ApiClient, RestCall};
use crate::error::{Result, ToolError};

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Scope {
    api_key: Option<String>,
    folder_id: Option<String>,
    external_id: Option<String>,
}

/// Empty / whitespace-only values count as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Scope {
    pub fn new(
        api_key: Option<String>,
        folder_id: Option<String>,
        external_id: Option<String>,
    ) -> Self {
        Self {
            api_key: non_empty(api_key),
            folder_id: non_empty(folder_id),
            external_id: non_empty(external_id),
        }
    }

    /// Layer per-request values over `self`, field by field.
    pub fn overlay(
        &self,
        api_key: Option<String>,
        folder_id: Option<String>,
        external_id: Option<String>,
    ) -> Self {
        Self {
            api_key: non_empty(api_key).or_else(|| self.api_key.clone()),
            folder_id: non_empty(folder_id).or_else(|| self.folder_id.clone()),
            external_id: non_empty(external_id).or_else(|| self.external_id.clone()),
        }
    }

    /// API key for downstream calls, or [`ToolError::MissingApiKey`].
    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or(ToolError::MissingApiKey)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref()
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    pub fn is_folder_scoped(&self) -> bool {
        self.folder_id.is_some()
    }
}

// Never print the key.
impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("folder_id", &self.folder_id)
            .field("external_id", &self.external_id)
            .finish()
    }
}

/// First string value found under any of `keys`.
///
/// The API is not consistent about camelCase vs snake_case across endpoints.
fn attribute<'v>(object: &'v Value, keys: &[&str]) -> Option<&'v str> {
    keys.iter().find_map(|k| object.get(*k).and_then(Value::as_str))
}

pub fn template_path(id: &str) -> String {
    format!("/v1/template/{}", segment(id))
}

pub fn render_path(id: &str) -> String {
    format!("/v1/render/{}", segment(id))
}

/// Gates and rewrites template operations according to a [`Scope`].
pub struct ScopeResolver<'a> {
    client: &'a ApiClient,
    scope: &'a Scope,
}

impl<'a> ScopeResolver<'a> {
    pub fn new(client: &'a ApiClient, scope: &'a Scope) -> Self {
        Self { client, scope }
    }

    pub fn scope(&self) -> &Scope {
        self.scope
    }

    /// Execute a call with this scope's API key.
    pub async fn execute(&self, call: &RestCall) -> Result<Value> {
        self.client.execute(self.scope.api_key()?, call).await
    }

    /// Fetch a template for a scope check. A downstream 404 is reported the
    /// same way as a scope mismatch.
    async fn fetch_for_check(&self, template_id: &str) -> Result<Value> {
        match self.execute(&RestCall::get(template_path(template_id))).await {
            Err(ToolError::Api { status: 404, .. }) => Err(out_of_scope(template_id)),
            other => other,
        }
    }

    fn check_folder(&self, template: &Value, template_id: &str) -> Result<()> {
        let Some(folder_id) = self.scope.folder_id() else {
            return Ok(());
        };
        if attribute(template, &["folderId", "folder_id"]) != Some(folder_id) {
            tracing::debug!(template_id, "Template outside configured folder");
            return Err(out_of_scope(template_id));
        }
        Ok(())
    }

    fn check_external_id(&self, template: &Value, template_id: &str) -> Result<()> {
        let Some(external_id) = self.scope.external_id() else {
            return Ok(());
        };
        if attribute(template, &["externalId", "external_id"]) != Some(external_id) {
            tracing::debug!(template_id, "Template outside configured external id");
            return Err(out_of_scope(template_id));
        }
        Ok(())
    }

    /// Fail unless the template lives in the configured folder. No-op without
    /// a folder scope.
    pub async fn validate_template_in_folder(&self, template_id: &str) -> Result<()> {
        if !self.scope.is_folder_scoped() {
            return Ok(());
        }
        let template = self.fetch_for_check(template_id).await?;
        self.check_folder(&template, template_id)
    }

    /// Fail unless the template carries the configured external id. No-op
    /// without an external-id scope.
    pub async fn validate_template_by_external_id(&self, template_id: &str) -> Result<()> {
        if self.scope.external_id().is_none() {
            return Ok(());
        }
        let template = self.fetch_for_check(template_id).await?;
        self.check_external_id(&template, template_id)
    }

    /// Both validators against a single fetch; each check is a no-op when its
    /// filter is unset.
    pub async fn ensure_template_access(&self, template_id: &str) -> Result<()> {
        if !self.scope.is_folder_scoped() && self.scope.external_id().is_none() {
            return Ok(());
        }
        let template = self.fetch_for_check(template_id).await?;
        self.check_folder(&template, template_id)?;
        self.check_external_id(&template, template_id)
    }

    /// Fail unless the render belongs to the scope: its own external id must
    /// match, and under a folder scope its template must live in the folder.
    ///
    /// Returns the fetched render, or `None` when the scope is unrestricted
    /// and nothing was fetched.
    pub async fn ensure_render_access(&self, render_id: &str) -> Result<Option<Value>> {
        if !self.scope.is_folder_scoped() && self.scope.external_id().is_none() {
            return Ok(None);
        }
        let render = match self.execute(&RestCall::get(render_path(render_id))).await {
            Err(ToolError::Api { status: 404, .. }) => return Err(render_out_of_scope(render_id)),
            other => other?,
        };

        if let Some(external_id) = self.scope.external_id() {
            if attribute(&render, &["externalId", "external_id"]) != Some(external_id) {
                tracing::debug!(render_id, "Render outside configured external id");
                return Err(render_out_of_scope(render_id));
            }
        }

        if self.scope.is_folder_scoped() {
            let Some(template_id) = attribute(&render, &["templateId", "template_id", "template"])
            else {
                tracing::debug!(render_id, "Render carries no template id");
                return Err(render_out_of_scope(render_id));
            };
            match self.validate_template_in_folder(template_id).await {
                Err(ToolError::OutOfScope { .. }) => return Err(render_out_of_scope(render_id)),
                other => other?,
            }
        }

        Ok(Some(render))
    }

    /// Attach a template to the configured folder. No-op without folder scope.
    pub async fn move_template_to_folder(&self, template_id: &str) -> Result<()> {
        let Some(folder_id) = self.scope.folder_id() else {
            return Ok(());
        };
        let call = RestCall::put(format!(
            "/v1/folder/{}/template/{}",
            segment(folder_id),
            segment(template_id)
        ));
        self.execute(&call).await?;
        tracing::debug!(template_id, folder_id, "Moved template into configured folder");
        Ok(())
    }

    /// Stamp the configured external id onto a template. No-op without
    /// external-id scope.
    pub async fn assign_external_id(&self, template_id: &str) -> Result<()> {
        let Some(external_id) = self.scope.external_id() else {
            return Ok(());
        };
        let call = RestCall::put(template_path(template_id))
            .with_body(json!({ "external_id": external_id }));
        self.execute(&call).await?;
        Ok(())
    }

    /// Listing path for templates: folder-scoped when a folder is configured.
    pub fn template_list_path(&self) -> String {
        match self.scope.folder_id() {
            Some(folder_id) => format!("/v1/folder/{}/templates", segment(folder_id)),
            None => "/v1/templates".to_string(),
        }
    }

    /// Append the external-id filter to a listing call when configured.
    pub fn apply_list_filter(&self, call: RestCall) -> RestCall {
        call.with_optional_query("external_id", self.scope.external_id())
    }
}

fn out_of_scope(template_id: &str) -> ToolError {
    ToolError::OutOfScope {
        kind: "Template",
        id: template_id.to_string(),
    }
}

fn render_out_of_scope(render_id: &str) -> ToolError {
    ToolError::OutOfScope {
        kind: "Render",
        id: render_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn scope(folder: Option<&str>, external: Option<&str>) -> Scope {
        Scope::new(
            Some("key".into()),
            folder.map(String::from),
            external.map(String::from),
        )
    }

    #[test]
    fn test_empty_values_are_unset() {
        let s = Scope::new(Some("".into()), Some("  ".into()), None);
        assert!(!s.has_api_key());
        assert!(!s.is_folder_scoped());
        assert!(matches!(s.api_key(), Err(ToolError::MissingApiKey)));
    }

    #[test]
    fn test_overlay_field_by_field() {
        let defaults = Scope::new(Some("env-key".into()), Some("f-env".into()), None);
        let s = defaults.overlay(None, None, Some("ext-req".into()));
        assert_eq!(s.api_key().unwrap(), "env-key");
        assert_eq!(s.folder_id(), Some("f-env"));
        assert_eq!(s.external_id(), Some("ext-req"));

        let s = defaults.overlay(Some("req-key".into()), Some("f-req".into()), None);
        assert_eq!(s.api_key().unwrap(), "req-key");
        assert_eq!(s.folder_id(), Some("f-req"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let s = Scope::new(Some("super-secret".into()), None, None);
        let dbg = format!("{:?}", s);
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn test_template_list_path() {
        let client = ApiClient::new("http://localhost:1").unwrap();
        let unscoped = scope(None, None);
        assert_eq!(
            ScopeResolver::new(&client, &unscoped).template_list_path(),
            "/v1/templates"
        );
        let scoped = scope(Some("f1"), None);
        assert_eq!(
            ScopeResolver::new(&client, &scoped).template_list_path(),
            "/v1/folder/f1/templates"
        );
    }

    #[test]
    fn test_apply_list_filter() {
        let client = ApiClient::new("http://localhost:1").unwrap();
        let s = scope(None, Some("acme"));
        let call = ScopeResolver::new(&client, &s).apply_list_filter(RestCall::get("/v1/renders"));
        assert_eq!(call.query_value("external_id"), Some("acme"));

        let s = scope(None, None);
        let call = ScopeResolver::new(&client, &s).apply_list_filter(RestCall::get("/v1/renders"));
        assert!(call.query.is_empty());
    }

    #[test]
    fn test_attribute_accepts_both_casings() {
        assert_eq!(attribute(&json!({"folderId": "a"}), &["folderId", "folder_id"]), Some("a"));
        assert_eq!(attribute(&json!({"folder_id": "b"}), &["folderId", "folder_id"]), Some("b"));
        assert_eq!(attribute(&json!({"folderId": null}), &["folderId", "folder_id"]), None);
    }

    #[tokio::test]
    async fn test_validators_noop_without_scope() {
        // Unreachable base: any request would fail
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let s = scope(None, None);
        let resolver = ScopeResolver::new(&client, &s);
        assert!(resolver.ensure_template_access("t1").await.is_ok());
        assert!(resolver.move_template_to_folder("t1").await.is_ok());
        assert!(resolver.assign_external_id("t1").await.is_ok());
    }

    #[tokio::test]
    async fn test_folder_validator_rejects_other_folder() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/template/t1");
                then.status(200)
                    .json_body(json!({"id": "t1", "folderId": "other"}));
            })
            .await;
        let client = ApiClient::new(&server.base_url()).unwrap();
        let s = scope(Some("mine"), None);
        let err = ScopeResolver::new(&client, &s)
            .validate_template_in_folder("t1")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::OutOfScope { .. }));
    }

    #[tokio::test]
    async fn test_missing_template_reported_as_out_of_scope() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/template/ghost");
                then.status(404).body("not found");
            })
            .await;
        let client = ApiClient::new(&server.base_url()).unwrap();
        let s = scope(None, Some("acme"));
        let err = ScopeResolver::new(&client, &s)
            .validate_template_by_external_id("ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::OutOfScope { .. }));
    }

    #[tokio::test]
    async fn test_both_filters_must_pass() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/template/t1");
                then.status(200)
                    .json_body(json!({"id": "t1", "folderId": "f1", "externalId": "other"}));
            })
            .await;
        let client = ApiClient::new(&server.base_url()).unwrap();

        let folder_only = scope(Some("f1"), None);
        assert!(ScopeResolver::new(&client, &folder_only)
            .ensure_template_access("t1")
            .await
            .is_ok());

        let both = scope(Some("f1"), Some("acme"));
        let err = ScopeResolver::new(&client, &both)
            .ensure_template_access("t1")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::OutOfScope { .. }));
    }

    #[tokio::test]
    async fn test_both_filters_share_one_fetch() {
        let server = MockServer::start_async().await;
        let fetch = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/template/t1");
                then.status(200)
                    .json_body(json!({"id": "t1", "folderId": "f1", "externalId": "acme"}));
            })
            .await;
        let client = ApiClient::new(&server.base_url()).unwrap();
        let both = scope(Some("f1"), Some("acme"));
        ScopeResolver::new(&client, &both)
            .ensure_template_access("t1")
            .await
            .unwrap();
        fetch.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn test_render_access_noop_without_scope() {
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let s = scope(None, None);
        let render = ScopeResolver::new(&client, &s)
            .ensure_render_access("r1")
            .await
            .unwrap();
        assert!(render.is_none());
    }

    #[tokio::test]
    async fn test_render_access_checks_external_id() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/render/r-mine");
                then.status(200)
                    .json_body(json!({"id": "r-mine", "external_id": "acme"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/render/r-other");
                then.status(200)
                    .json_body(json!({"id": "r-other", "external_id": "other-tenant"}));
            })
            .await;
        let client = ApiClient::new(&server.base_url()).unwrap();
        let s = scope(None, Some("acme"));
        let resolver = ScopeResolver::new(&client, &s);

        let render = resolver.ensure_render_access("r-mine").await.unwrap();
        assert_eq!(render.unwrap()["id"], "r-mine");

        let err = resolver.ensure_render_access("r-other").await.unwrap_err();
        assert!(matches!(err, ToolError::OutOfScope { kind: "Render", .. }));
    }

    #[tokio::test]
    async fn test_render_access_checks_template_folder() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/render/r1");
                then.status(200).json_body(json!({"id": "r1", "templateId": "t1"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/template/t1");
                then.status(200).json_body(json!({"id": "t1", "folderId": "f-other"}));
            })
            .await;
        let client = ApiClient::new(&server.base_url()).unwrap();
        let s = scope(Some("f1"), None);
        let err = ScopeResolver::new(&client, &s)
            .ensure_render_access("r1")
            .await
            .unwrap_err();
        match err {
            ToolError::OutOfScope { kind, id } => {
                assert_eq!(kind, "Render");
                assert_eq!(id, "r1");
            }
            other => panic!("expected OutOfScope, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_move_template_to_folder_calls_attach() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/v1/folder/f1/template/t9")
                    .header("authorization", "Bearer key");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;
        let client = ApiClient::new(&server.base_url()).unwrap();
        let s = scope(Some("f1"), None);
        ScopeResolver::new(&client, &s)
            .move_template_to_folder("t9")
            .await
            .unwrap();
        mock.assert_async().await;
    }
}

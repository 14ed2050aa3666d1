//! MCP tool registry and dispatch
//!
//! The registry is static data: one [`ToolDef`] per tool, holding its schema
//! and a handler reference. What a caller sees is computed per request from
//! the registry and the caller's [`Scope`]; the registry itself never changes.

mod account;
mod assets;
mod folders;
mod renders;
mod templates;

use std::sync::LazyLock;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::{Result, ToolError};
use crate::scope::{Scope, ScopeResolver};

use super::types::{CallToolResult, Tool};

/// Everything a handler needs for one call: the shared client and the
/// caller's scope, owned for the duration of the call.
pub struct ToolContext {
    client: ApiClient,
    scope: Scope,
}

impl ToolContext {
    pub fn new(client: ApiClient, scope: Scope) -> Self {
        Self { client, scope }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn resolver(&self) -> ScopeResolver<'_> {
        ScopeResolver::new(&self.client, &self.scope)
    }
}

pub type Handler = for<'a> fn(&'a ToolContext, Value) -> BoxFuture<'a, Result<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolGroup {
    Templates,
    Renders,
    /// Folder management. Hidden while a folder scope pins the session.
    Folders,
    Uploads,
    Fonts,
    Account,
}

pub struct ToolDef {
    pub name: &'static str,
    pub group: ToolGroup,
    pub description: &'static str,
    /// Replaces `description` while a folder scope is active.
    pub folder_scoped_description: Option<&'static str>,
    pub input_schema: Value,
    pub handler: Handler,
}

impl ToolDef {
    fn is_visible(&self, scope: &Scope) -> bool {
        !(scope.is_folder_scoped() && self.group == ToolGroup::Folders)
    }

    fn describe(&self, scope: &Scope) -> Tool {
        let description = match self.folder_scoped_description {
            Some(scoped) if scope.is_folder_scoped() => scoped,
            _ => self.description,
        };
        Tool {
            name: self.name.to_string(),
            description: description.to_string(),
            input_schema: self.input_schema.clone(),
        }
    }
}

static REGISTRY: LazyLock<Vec<ToolDef>> = LazyLock::new(|| {
    let mut tools = templates::tools();
    tools.extend(renders::tools());
    tools.extend(folders::tools());
    tools.extend(assets::tools());
    tools.extend(account::tools());
    tools
});

/// The full, unfiltered tool registry.
pub fn registry() -> &'static [ToolDef] {
    &REGISTRY
}

/// Tools as `scope` sees them: folder management removed and descriptions
/// relabeled under a folder scope.
pub fn visible_tools(registry: &[ToolDef], scope: &Scope) -> Vec<Tool> {
    registry
        .iter()
        .filter(|def| def.is_visible(scope))
        .map(|def| def.describe(scope))
        .collect()
}

/// Look up a tool callable under `scope`. Hidden tools are not callable.
pub fn find_tool<'r>(registry: &'r [ToolDef], scope: &Scope, name: &str) -> Option<&'r ToolDef> {
    registry
        .iter()
        .find(|def| def.name == name && def.is_visible(scope))
}

/// Handle tools/list request - return tools visible under `scope`
pub fn handle_tools_list(scope: &Scope) -> Value {
    json!({ "tools": visible_tools(registry(), scope) })
}

/// Dispatch one tool call. Never fails: every error becomes an
/// `isError: true` result so one bad call can't take down its siblings.
pub async fn call_tool(ctx: &ToolContext, name: &str, arguments: Value) -> CallToolResult {
    let start = std::time::Instant::now();
    tracing::debug!(tool = name, "MCP tool call started");

    let result = match find_tool(registry(), ctx.scope(), name) {
        Some(def) => (def.handler)(ctx, arguments).await,
        None => Err(ToolError::UnknownTool(name.to_string())),
    };

    let elapsed_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(value) => {
            tracing::info!(tool = name, elapsed_ms, "MCP tool call completed");
            let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            CallToolResult::text(text)
        }
        Err(e) => {
            tracing::warn!(tool = name, elapsed_ms, error = %e, "MCP tool call failed");
            CallToolResult::error(format!("Error: {}", e))
        }
    }
}

// ===== Helpers shared by handler modules =====

/// Deserialize tool arguments. A missing arguments object counts as `{}`.
pub(crate) fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    Ok(serde_json::from_value(arguments)?)
}

/// Serialize a request body. Optional fields are skipped, never sent as null.
pub(crate) fn to_body<T: Serialize>(body: &T) -> Result<Value> {
    Ok(serde_json::to_value(body)?)
}

/// Object schema with the given properties and required keys.
pub(crate) fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Page/limit properties shared by listing tools.
pub(crate) fn pagination_properties() -> serde_json::Map<String, Value> {
    let mut props = serde_json::Map::new();
    props.insert(
        "page".into(),
        json!({
            "type": "integer",
            "description": "Page number, starting at 0",
            "minimum": 0
        }),
    );
    props.insert(
        "limit".into(),
        json!({
            "type": "integer",
            "description": "Results per page (default: 25, max: 100)",
            "minimum": 1,
            "maximum": 100
        }),
    );
    props
}

/// Merge `extra` object properties with pagination properties.
pub(crate) fn paginated(extra: Value) -> Value {
    let mut props = pagination_properties();
    if let Value::Object(extra) = extra {
        props.extend(extra);
    }
    Value::Object(props)
}

/// Id of a freshly created object, from the creation response.
pub(crate) fn created_id(value: &Value) -> Option<String> {
    value
        .get("id")
        .and_then(|id| match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

//! Render tools

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::RestCall;
use crate::error::Result;
use crate::scope::render_path;

use super::{object_schema, paginated, parse_args, to_body, ToolContext, ToolDef, ToolGroup};

pub(super) fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "create_render",
            group: ToolGroup::Renders,
            description: "Render a template to an image, video or PDF. Layer contents are overridden by layer name.",
            folder_scoped_description: None,
            input_schema: object_schema(
                json!({
                    "templateId": {"type": "string", "description": "Template to render"},
                    "layers": {
                        "type": "object",
                        "description": "Overrides keyed by layer name, e.g. {\"title\": {\"text\": \"Hello\"}}"
                    },
                    "pages": {
                        "type": "array",
                        "items": {"type": "object"},
                        "description": "Per-page layer overrides for multi-page templates"
                    },
                    "format": {
                        "type": "string",
                        "enum": ["jpg", "png", "webp", "pdf", "mp4"],
                        "description": "Output format (default: jpg)"
                    },
                    "name": {"type": "string", "description": "Name for the render"},
                    "transparent": {
                        "type": "boolean",
                        "description": "Transparent background (png only)"
                    },
                    "duration": {
                        "type": "integer",
                        "description": "Video length in milliseconds (mp4 only)"
                    },
                    "fps": {"type": "integer", "description": "Video frame rate (mp4 only)"},
                    "webhookUrl": {
                        "type": "string",
                        "description": "URL notified when the render completes"
                    },
                    "async": {
                        "type": "boolean",
                        "description": "Return immediately instead of waiting for the render"
                    }
                }),
                &["templateId"],
            ),
            handler: create_render,
        },
        ToolDef {
            name: "get_render",
            group: ToolGroup::Renders,
            description: "Get a render by id, including its status and output URL.",
            folder_scoped_description: None,
            input_schema: render_id_schema(),
            handler: get_render,
        },
        ToolDef {
            name: "list_renders",
            group: ToolGroup::Renders,
            description: "List renders in the account, newest first.",
            folder_scoped_description: None,
            input_schema: object_schema(paginated(json!({})), &[]),
            handler: list_renders,
        },
        ToolDef {
            name: "delete_render",
            group: ToolGroup::Renders,
            description: "Delete a render and its output file.",
            folder_scoped_description: None,
            input_schema: render_id_schema(),
            handler: delete_render,
        },
        ToolDef {
            name: "merge_renders",
            group: ToolGroup::Renders,
            description: "Merge several PDF renders into a single PDF.",
            folder_scoped_description: None,
            input_schema: object_schema(
                json!({
                    "renderIds": {
                        "type": "array",
                        "items": {"type": "string"},
                        "minItems": 2,
                        "description": "PDF renders to merge, in order"
                    },
                    "name": {"type": "string", "description": "Name for the merged PDF"}
                }),
                &["renderIds"],
            ),
            handler: merge_renders,
        },
    ]
}

fn render_id_schema() -> Value {
    object_schema(
        json!({
            "renderId": {"type": "string", "description": "Render id"}
        }),
        &["renderId"],
    )
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRenderArgs {
    #[serde(rename(deserialize = "templateId", serialize = "template"))]
    template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    layers: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transparent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fps: Option<u32>,
    #[serde(
        rename(deserialize = "webhookUrl", serialize = "webhook_url"),
        skip_serializing_if = "Option::is_none"
    )]
    webhook_url: Option<String>,
    #[serde(rename = "async", skip_serializing_if = "Option::is_none")]
    is_async: Option<bool>,
    #[serde(
        rename(serialize = "external_id"),
        skip_deserializing,
        skip_serializing_if = "Option::is_none"
    )]
    external_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderIdArgs {
    render_id: String,
}

#[derive(Debug, Deserialize)]
struct PageArgs {
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergeArgs {
    render_ids: Vec<String>,
    name: Option<String>,
}

fn create_render(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let mut args: CreateRenderArgs = parse_args(args)?;
        args.external_id = ctx.scope().external_id().map(String::from);

        let resolver = ctx.resolver();
        resolver.ensure_template_access(&args.template_id).await?;
        let call = RestCall::post("/v1/render").with_body(to_body(&args)?);
        resolver.execute(&call).await
    })
}

fn get_render(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: RenderIdArgs = parse_args(args)?;
        let resolver = ctx.resolver();
        // The scope check already fetched the render
        if let Some(render) = resolver.ensure_render_access(&args.render_id).await? {
            return Ok(render);
        }
        resolver
            .execute(&RestCall::get(render_path(&args.render_id)))
            .await
    })
}

fn list_renders(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: PageArgs = parse_args(args)?;
        let resolver = ctx.resolver();
        let call = RestCall::get("/v1/renders")
            .with_optional_query("page", args.page)
            .with_optional_query("limit", args.limit);
        resolver.execute(&resolver.apply_list_filter(call)).await
    })
}

fn delete_render(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: RenderIdArgs = parse_args(args)?;
        let resolver = ctx.resolver();
        resolver.ensure_render_access(&args.render_id).await?;
        resolver
            .execute(&RestCall::delete(render_path(&args.render_id)))
            .await
    })
}

fn merge_renders(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: MergeArgs = parse_args(args)?;
        let resolver = ctx.resolver();
        for render_id in &args.render_ids {
            resolver.ensure_render_access(render_id).await?;
        }
        let mut body = json!({ "ids": args.render_ids });
        if let Some(name) = args.name {
            body["name"] = json!(name);
        }
        resolver
            .execute(&RestCall::post("/v1/render/merge").with_body(body))
            .await
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_render_body_renames_and_skips() {
        let args: CreateRenderArgs = parse_args(json!({
            "templateId": "t1",
            "layers": {"title": {"text": "Hi"}}
        }))
        .unwrap();
        let body = to_body(&args).unwrap();
        assert_eq!(
            body,
            json!({"template": "t1", "layers": {"title": {"text": "Hi"}}})
        );
    }

    #[test]
    fn test_create_render_optional_wire_names() {
        let mut args: CreateRenderArgs = parse_args(json!({
            "templateId": "t1",
            "format": "png",
            "webhookUrl": "https://hook.example.com",
            "async": true
        }))
        .unwrap();
        args.external_id = Some("acme".into());
        let body = to_body(&args).unwrap();
        assert_eq!(body["format"], "png");
        assert_eq!(body["webhook_url"], "https://hook.example.com");
        assert_eq!(body["async"], true);
        assert_eq!(body["external_id"], "acme");
        assert!(body.get("templateId").is_none());
    }

    #[test]
    fn test_render_path_escapes_id() {
        assert_eq!(render_path("r/1"), "/v1/render/r%2F1");
    }
}

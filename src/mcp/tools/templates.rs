//! Template tools - list, read, create, update, clone, delete, tag
//!
//! Every operation that targets an existing template runs both scope
//! validators first. Create and clone are two-phase: the template is created,
//! then attached to the configured scope.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::RestCall;
use crate::error::{Result, ToolError};
use crate::scope::{template_path, ScopeResolver};

use super::{
    created_id, object_schema, paginated, parse_args, to_body, ToolContext, ToolDef, ToolGroup,
};

pub(super) fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "list_templates",
            group: ToolGroup::Templates,
            description: "List templates in the account. Supports text search, size filters and tags.",
            folder_scoped_description: Some(
                "List templates in the configured folder. Supports text search, size filters and tags.",
            ),
            input_schema: object_schema(
                paginated(json!({
                    "query": {
                        "type": "string",
                        "description": "Search templates by name"
                    },
                    "width": {
                        "type": "integer",
                        "description": "Only templates with this width in pixels"
                    },
                    "height": {
                        "type": "integer",
                        "description": "Only templates with this height in pixels"
                    },
                    "tags": {
                        "type": "string",
                        "description": "Comma-separated tags to filter by"
                    },
                    "includeLayers": {
                        "type": "boolean",
                        "description": "Include each template's layers in the response (default: false)"
                    }
                })),
                &[],
            ),
            handler: list_templates,
        },
        ToolDef {
            name: "get_template",
            group: ToolGroup::Templates,
            description: "Get a template by id, including its dimensions, folder and metadata.",
            folder_scoped_description: None,
            input_schema: template_id_schema(),
            handler: get_template,
        },
        ToolDef {
            name: "get_template_layers",
            group: ToolGroup::Templates,
            description: "List the layers of a template. Layer names are the keys used to override content when rendering.",
            folder_scoped_description: None,
            input_schema: template_id_schema(),
            handler: get_template_layers,
        },
        ToolDef {
            name: "get_template_pages",
            group: ToolGroup::Templates,
            description: "List the pages of a multi-page template with their layers.",
            folder_scoped_description: None,
            input_schema: template_id_schema(),
            handler: get_template_pages,
        },
        ToolDef {
            name: "create_template",
            group: ToolGroup::Templates,
            description: "Create a new template from dimensions and an optional list of layers.",
            folder_scoped_description: Some(
                "Create a new template in the configured folder from dimensions and an optional list of layers.",
            ),
            input_schema: object_schema(
                json!({
                    "name": {"type": "string", "description": "Template name"},
                    "width": {"type": "integer", "description": "Width in pixels"},
                    "height": {"type": "integer", "description": "Height in pixels"},
                    "description": {"type": "string", "description": "Free-form description"},
                    "layers": {
                        "type": "array",
                        "items": {"type": "object"},
                        "description": "Layer definitions (text, image, shape...)"
                    },
                    "pages": {
                        "type": "array",
                        "items": {"type": "object"},
                        "description": "Page definitions for multi-page templates"
                    },
                    "tags": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Tags to attach"
                    }
                }),
                &["name", "width", "height"],
            ),
            handler: create_template,
        },
        ToolDef {
            name: "update_template",
            group: ToolGroup::Templates,
            description: "Update a template's name, size, description, tags or layers. Omitted fields are left unchanged.",
            folder_scoped_description: None,
            input_schema: object_schema(
                json!({
                    "templateId": {"type": "string", "description": "Template id"},
                    "name": {"type": "string", "description": "New name"},
                    "width": {"type": "integer", "description": "New width in pixels"},
                    "height": {"type": "integer", "description": "New height in pixels"},
                    "description": {"type": "string", "description": "New description"},
                    "layers": {
                        "type": "array",
                        "items": {"type": "object"},
                        "description": "Layer updates, matched by layer name"
                    },
                    "replaceLayers": {
                        "type": "boolean",
                        "description": "Replace all layers instead of merging by name (default: false)"
                    },
                    "tags": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Replacement tags"
                    }
                }),
                &["templateId"],
            ),
            handler: update_template,
        },
        ToolDef {
            name: "delete_template",
            group: ToolGroup::Templates,
            description: "Delete a template permanently.",
            folder_scoped_description: None,
            input_schema: template_id_schema(),
            handler: delete_template,
        },
        ToolDef {
            name: "clone_template",
            group: ToolGroup::Templates,
            description: "Duplicate a template, optionally under a new name.",
            folder_scoped_description: Some(
                "Duplicate a template, optionally under a new name. The copy is placed in the configured folder.",
            ),
            input_schema: object_schema(
                json!({
                    "templateId": {"type": "string", "description": "Template to clone"},
                    "name": {"type": "string", "description": "Name for the copy"}
                }),
                &["templateId"],
            ),
            handler: clone_template,
        },
        ToolDef {
            name: "list_template_renders",
            group: ToolGroup::Templates,
            description: "List renders produced from a template, newest first.",
            folder_scoped_description: None,
            input_schema: object_schema(
                paginated(json!({
                    "templateId": {"type": "string", "description": "Template id"}
                })),
                &["templateId"],
            ),
            handler: list_template_renders,
        },
        ToolDef {
            name: "add_template_tags",
            group: ToolGroup::Templates,
            description: "Add tags to a template.",
            folder_scoped_description: None,
            input_schema: tags_schema(),
            handler: add_template_tags,
        },
        ToolDef {
            name: "remove_template_tags",
            group: ToolGroup::Templates,
            description: "Remove tags from a template.",
            folder_scoped_description: None,
            input_schema: tags_schema(),
            handler: remove_template_tags,
        },
        ToolDef {
            name: "list_gallery_templates",
            group: ToolGroup::Templates,
            description: "Browse the public template gallery. Gallery templates can be cloned into the account.",
            folder_scoped_description: None,
            input_schema: object_schema(
                paginated(json!({
                    "query": {"type": "string", "description": "Search gallery templates by name"},
                    "category": {"type": "string", "description": "Gallery category"}
                })),
                &[],
            ),
            handler: list_gallery_templates,
        },
    ]
}

fn template_id_schema() -> Value {
    object_schema(
        json!({
            "templateId": {"type": "string", "description": "Template id"}
        }),
        &["templateId"],
    )
}

fn tags_schema() -> Value {
    object_schema(
        json!({
            "templateId": {"type": "string", "description": "Template id"},
            "tags": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Tags"
            }
        }),
        &["templateId", "tags"],
    )
}

// ===== Arguments =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateIdArgs {
    template_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTemplatesArgs {
    query: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    tags: Option<String>,
    include_layers: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
struct CreateTemplateArgs {
    name: String,
    width: u32,
    height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    layers: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
    /// Filled from scope, never from the caller.
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    external_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTemplateArgs {
    #[serde(skip_serializing)]
    template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    layers: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replace_layers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct CloneTemplateArgs {
    #[serde(skip_serializing)]
    template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateRendersArgs {
    template_id: String,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagsArgs {
    template_id: String,
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GalleryArgs {
    query: Option<String>,
    category: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

// ===== Handlers =====

fn list_templates(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: ListTemplatesArgs = parse_args(args)?;
        let resolver = ctx.resolver();
        let call = RestCall::get(resolver.template_list_path())
            .with_optional_query("query", args.query)
            .with_optional_query("page", args.page)
            .with_optional_query("limit", args.limit)
            .with_optional_query("width", args.width)
            .with_optional_query("height", args.height)
            .with_optional_query("tags", args.tags)
            .with_optional_query("includeLayers", args.include_layers);
        resolver.execute(&resolver.apply_list_filter(call)).await
    })
}

/// Validate access, then GET `suffix` under the template path.
async fn get_scoped(ctx: &ToolContext, args: Value, suffix: &str) -> Result<Value> {
    let args: TemplateIdArgs = parse_args(args)?;
    let resolver = ctx.resolver();
    resolver.ensure_template_access(&args.template_id).await?;
    let path = format!("{}{}", template_path(&args.template_id), suffix);
    resolver.execute(&RestCall::get(path)).await
}

fn get_template(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(get_scoped(ctx, args, ""))
}

fn get_template_layers(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(get_scoped(ctx, args, "/layers"))
}

fn get_template_pages(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(get_scoped(ctx, args, "/pages"))
}

fn create_template(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let mut args: CreateTemplateArgs = parse_args(args)?;
        args.external_id = ctx.scope().external_id().map(String::from);

        let resolver = ctx.resolver();
        let created = resolver
            .execute(&RestCall::post("/v1/template").with_body(to_body(&args)?))
            .await?;

        // external_id already went out with the creation body
        attach_new_template(&resolver, &created, false).await?;
        Ok(created)
    })
}

fn update_template(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: UpdateTemplateArgs = parse_args(args)?;
        let resolver = ctx.resolver();
        resolver.ensure_template_access(&args.template_id).await?;
        let call = RestCall::put(template_path(&args.template_id)).with_body(to_body(&args)?);
        resolver.execute(&call).await
    })
}

fn delete_template(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: TemplateIdArgs = parse_args(args)?;
        let resolver = ctx.resolver();
        resolver.ensure_template_access(&args.template_id).await?;
        resolver
            .execute(&RestCall::delete(template_path(&args.template_id)))
            .await
    })
}

fn clone_template(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: CloneTemplateArgs = parse_args(args)?;
        let resolver = ctx.resolver();
        resolver.ensure_template_access(&args.template_id).await?;

        let call = RestCall::post(format!("{}/clone", template_path(&args.template_id)))
            .with_body(to_body(&args)?);
        let cloned = resolver.execute(&call).await?;

        attach_new_template(&resolver, &cloned, true).await?;
        Ok(cloned)
    })
}

fn list_template_renders(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: TemplateRendersArgs = parse_args(args)?;
        let resolver = ctx.resolver();
        resolver.ensure_template_access(&args.template_id).await?;
        let call = RestCall::get(format!("{}/renders", template_path(&args.template_id)))
            .with_optional_query("page", args.page)
            .with_optional_query("limit", args.limit);
        resolver.execute(&call).await
    })
}

fn add_template_tags(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: TagsArgs = parse_args(args)?;
        let resolver = ctx.resolver();
        resolver.ensure_template_access(&args.template_id).await?;
        let call = RestCall::post(format!("{}/tags", template_path(&args.template_id)))
            .with_body(json!({ "tags": args.tags }));
        resolver.execute(&call).await
    })
}

fn remove_template_tags(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: TagsArgs = parse_args(args)?;
        let resolver = ctx.resolver();
        resolver.ensure_template_access(&args.template_id).await?;
        let call = RestCall::delete(format!("{}/tags", template_path(&args.template_id)))
            .with_body(json!({ "tags": args.tags }));
        resolver.execute(&call).await
    })
}

fn list_gallery_templates(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: GalleryArgs = parse_args(args)?;
        let call = RestCall::get("/v1/templates/gallery")
            .with_optional_query("query", args.query)
            .with_optional_query("category", args.category)
            .with_optional_query("page", args.page)
            .with_optional_query("limit", args.limit);
        ctx.resolver().execute(&call).await
    })
}

// ===== Two-phase creation =====

/// Phase two of create/clone: stamp the external id (clone only), then move
/// into the configured folder.
///
/// If this fails the new template already exists outside the scope. It is
/// deleted again and the error names the failed step; if that delete fails
/// too, the error carries the orphaned id.
async fn attach_new_template(
    resolver: &ScopeResolver<'_>,
    created: &Value,
    assign_external_id: bool,
) -> Result<()> {
    let scope = resolver.scope();
    let needs_external = assign_external_id && scope.external_id().is_some();
    if !needs_external && !scope.is_folder_scoped() {
        return Ok(());
    }

    let Some(id) = created_id(created) else {
        tracing::error!(response = %created, "Creation response carried no template id");
        return Err(ToolError::UnidentifiedTemplate {
            response: created.to_string(),
        });
    };

    let mut failure: Option<(&'static str, ToolError)> = None;
    if needs_external {
        if let Err(e) = resolver.assign_external_id(&id).await {
            failure = Some(("assigning the configured external id", e));
        }
    }
    if failure.is_none() {
        if let Err(e) = resolver.move_template_to_folder(&id).await {
            failure = Some(("moving it into the configured folder", e));
        }
    }

    let Some((step, source)) = failure else {
        return Ok(());
    };

    let cleanup = match resolver.execute(&RestCall::delete(template_path(&id))).await {
        Ok(_) => {
            tracing::warn!(
                template_id = %id,
                step,
                error = %source,
                "Scope attach failed, new template deleted"
            );
            "The new template was deleted again; retry the call.".to_string()
        }
        Err(e) => {
            tracing::error!(
                template_id = %id,
                step,
                error = %e,
                "Scope attach failed and cleanup failed"
            );
            format!(
                "Deleting it also failed ({}); template {} now exists outside the configured scope and must be removed manually.",
                e, id
            )
        }
    };

    Err(ToolError::ScopeAttach {
        id,
        step,
        source: Box::new(source),
        cleanup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_body_omits_unset_optionals() {
        let args: CreateTemplateArgs =
            parse_args(json!({"name": "Banner", "width": 1200, "height": 628})).unwrap();
        let body = to_body(&args).unwrap();
        assert_eq!(body, json!({"name": "Banner", "width": 1200, "height": 628}));
    }

    #[test]
    fn test_create_ignores_caller_external_id() {
        let args: CreateTemplateArgs = parse_args(json!({
            "name": "Banner", "width": 1, "height": 1, "external_id": "spoofed"
        }))
        .unwrap();
        assert!(args.external_id.is_none());
    }

    #[test]
    fn test_update_body_excludes_template_id() {
        let args: UpdateTemplateArgs =
            parse_args(json!({"templateId": "t1", "name": "Renamed"})).unwrap();
        let body = to_body(&args).unwrap();
        assert_eq!(body, json!({"name": "Renamed"}));
    }

    #[test]
    fn test_missing_required_argument_rejected() {
        let err = parse_args::<TemplateIdArgs>(json!({})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(err.to_string().contains("templateId"));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let err = parse_args::<CreateTemplateArgs>(json!({
            "name": "Banner", "width": "wide", "height": 1
        }))
        .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}

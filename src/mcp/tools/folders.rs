//! Folder management tools
//!
//! The whole group disappears while a folder scope is active.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::{segment, RestCall};
use crate::error::Result;

use super::{object_schema, paginated, parse_args, to_body, ToolContext, ToolDef, ToolGroup};

pub(super) fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "list_folders",
            group: ToolGroup::Folders,
            description: "List folders in the account.",
            folder_scoped_description: None,
            input_schema: object_schema(
                paginated(json!({
                    "query": {"type": "string", "description": "Search folders by name"}
                })),
                &[],
            ),
            handler: list_folders,
        },
        ToolDef {
            name: "create_folder",
            group: ToolGroup::Folders,
            description: "Create a folder for organising templates.",
            folder_scoped_description: None,
            input_schema: object_schema(
                json!({
                    "name": {"type": "string", "description": "Folder name"}
                }),
                &["name"],
            ),
            handler: create_folder,
        },
        ToolDef {
            name: "update_folder",
            group: ToolGroup::Folders,
            description: "Rename a folder.",
            folder_scoped_description: None,
            input_schema: object_schema(
                json!({
                    "folderId": {"type": "string", "description": "Folder id"},
                    "name": {"type": "string", "description": "New folder name"}
                }),
                &["folderId", "name"],
            ),
            handler: update_folder,
        },
        ToolDef {
            name: "delete_folder",
            group: ToolGroup::Folders,
            description: "Delete a folder. Templates inside it are kept and become unfiled.",
            folder_scoped_description: None,
            input_schema: folder_id_schema(),
            handler: delete_folder,
        },
        ToolDef {
            name: "list_folder_templates",
            group: ToolGroup::Folders,
            description: "List templates in a folder.",
            folder_scoped_description: None,
            input_schema: object_schema(
                paginated(json!({
                    "folderId": {"type": "string", "description": "Folder id"}
                })),
                &["folderId"],
            ),
            handler: list_folder_templates,
        },
        ToolDef {
            name: "move_template_to_folder",
            group: ToolGroup::Folders,
            description: "Move a template into a folder.",
            folder_scoped_description: None,
            input_schema: object_schema(
                json!({
                    "folderId": {"type": "string", "description": "Destination folder id"},
                    "templateId": {"type": "string", "description": "Template to move"}
                }),
                &["folderId", "templateId"],
            ),
            handler: move_template_to_folder,
        },
    ]
}

fn folder_id_schema() -> Value {
    object_schema(
        json!({
            "folderId": {"type": "string", "description": "Folder id"}
        }),
        &["folderId"],
    )
}

fn folder_path(id: &str) -> String {
    format!("/v1/folder/{}", segment(id))
}

#[derive(Debug, Deserialize)]
struct ListFoldersArgs {
    query: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct FolderArgs {
    #[serde(default, skip_serializing)]
    folder_id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderIdArgs {
    folder_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderTemplatesArgs {
    folder_id: String,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveArgs {
    folder_id: String,
    template_id: String,
}

fn list_folders(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: ListFoldersArgs = parse_args(args)?;
        let call = RestCall::get("/v1/folders")
            .with_optional_query("query", args.query)
            .with_optional_query("page", args.page)
            .with_optional_query("limit", args.limit);
        ctx.resolver().execute(&call).await
    })
}

fn create_folder(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: FolderArgs = parse_args(args)?;
        let call = RestCall::post("/v1/folder").with_body(to_body(&args)?);
        ctx.resolver().execute(&call).await
    })
}

fn update_folder(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: FolderArgs = parse_args(args)?;
        let call = RestCall::put(folder_path(&args.folder_id)).with_body(to_body(&args)?);
        ctx.resolver().execute(&call).await
    })
}

fn delete_folder(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: FolderIdArgs = parse_args(args)?;
        ctx.resolver()
            .execute(&RestCall::delete(folder_path(&args.folder_id)))
            .await
    })
}

fn list_folder_templates(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: FolderTemplatesArgs = parse_args(args)?;
        let resolver = ctx.resolver();
        let call = RestCall::get(format!("{}/templates", folder_path(&args.folder_id)))
            .with_optional_query("page", args.page)
            .with_optional_query("limit", args.limit);
        resolver.execute(&resolver.apply_list_filter(call)).await
    })
}

fn move_template_to_folder(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: MoveArgs = parse_args(args)?;
        let resolver = ctx.resolver();
        // Only reachable without folder scope, so only the tenant check applies
        resolver
            .validate_template_by_external_id(&args.template_id)
            .await?;
        let call = RestCall::put(format!(
            "{}/template/{}",
            folder_path(&args.folder_id),
            segment(&args.template_id)
        ));
        resolver.execute(&call).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_folder_tool_is_in_folder_group() {
        assert!(tools().iter().all(|t| t.group == ToolGroup::Folders));
    }

    #[test]
    fn test_folder_body_is_name_only() {
        let args: FolderArgs = parse_args(json!({"folderId": "f1", "name": "Q3"})).unwrap();
        assert_eq!(to_body(&args).unwrap(), json!({"name": "Q3"}));
    }
}

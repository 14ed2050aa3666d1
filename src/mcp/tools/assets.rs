//! Upload and font tools

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::{segment, RestCall};
use crate::error::Result;

use super::{object_schema, paginated, parse_args, to_body, ToolContext, ToolDef, ToolGroup};

pub(super) fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "list_uploads",
            group: ToolGroup::Uploads,
            description: "List uploaded images and videos available to templates.",
            folder_scoped_description: None,
            input_schema: object_schema(paginated(json!({})), &[]),
            handler: list_uploads,
        },
        ToolDef {
            name: "create_upload",
            group: ToolGroup::Uploads,
            description: "Upload an image or video from a public URL.",
            folder_scoped_description: None,
            input_schema: object_schema(
                json!({
                    "url": {"type": "string", "description": "Public URL of the file"},
                    "name": {"type": "string", "description": "Display name"}
                }),
                &["url"],
            ),
            handler: create_upload,
        },
        ToolDef {
            name: "delete_upload",
            group: ToolGroup::Uploads,
            description: "Delete an uploaded file.",
            folder_scoped_description: None,
            input_schema: object_schema(
                json!({
                    "uploadId": {"type": "string", "description": "Upload id"}
                }),
                &["uploadId"],
            ),
            handler: delete_upload,
        },
        ToolDef {
            name: "list_fonts",
            group: ToolGroup::Fonts,
            description: "List custom fonts uploaded to the account.",
            folder_scoped_description: None,
            input_schema: object_schema(paginated(json!({})), &[]),
            handler: list_fonts,
        },
        ToolDef {
            name: "upload_font",
            group: ToolGroup::Fonts,
            description: "Add a custom font from a public URL to a TTF, OTF or WOFF file.",
            folder_scoped_description: None,
            input_schema: object_schema(
                json!({
                    "url": {"type": "string", "description": "Public URL of the font file"},
                    "name": {"type": "string", "description": "Font family name"}
                }),
                &["url"],
            ),
            handler: upload_font,
        },
        ToolDef {
            name: "delete_font",
            group: ToolGroup::Fonts,
            description: "Delete a custom font.",
            folder_scoped_description: None,
            input_schema: object_schema(
                json!({
                    "fontId": {"type": "string", "description": "Font id"}
                }),
                &["fontId"],
            ),
            handler: delete_font,
        },
    ]
}

#[derive(Debug, Deserialize)]
struct PageArgs {
    page: Option<u32>,
    limit: Option<u32>,
}

/// Body shared by uploads and fonts: a source URL plus optional name.
#[derive(Debug, Deserialize, Serialize)]
struct UrlArgs {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadIdArgs {
    upload_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FontIdArgs {
    font_id: String,
}

fn paged_get(path: &'static str, args: PageArgs) -> RestCall {
    RestCall::get(path)
        .with_optional_query("page", args.page)
        .with_optional_query("limit", args.limit)
}

fn list_uploads(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let call = paged_get("/v1/uploads", parse_args(args)?);
        ctx.resolver().execute(&call).await
    })
}

fn create_upload(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: UrlArgs = parse_args(args)?;
        let call = RestCall::post("/v1/upload").with_body(to_body(&args)?);
        ctx.resolver().execute(&call).await
    })
}

fn delete_upload(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: UploadIdArgs = parse_args(args)?;
        let path = format!("/v1/upload/{}", segment(&args.upload_id));
        ctx.resolver().execute(&RestCall::delete(path)).await
    })
}

fn list_fonts(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let call = paged_get("/v1/fonts", parse_args(args)?);
        ctx.resolver().execute(&call).await
    })
}

fn upload_font(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: UrlArgs = parse_args(args)?;
        let call = RestCall::post("/v1/font").with_body(to_body(&args)?);
        ctx.resolver().execute(&call).await
    })
}

fn delete_font(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let args: FontIdArgs = parse_args(args)?;
        let path = format!("/v1/font/{}", segment(&args.font_id));
        ctx.resolver().execute(&RestCall::delete(path)).await
    })
}

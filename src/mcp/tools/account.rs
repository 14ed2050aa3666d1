use futures::future::BoxFuture;
use serde_json::{json, Value};

use crate::client::RestCall;
use crate::error::Result;

use super::{object_schema, ToolContext, ToolDef, ToolGroup};

pub(super) fn tools() -> Vec<ToolDef> {
    vec![ToolDef {
        name: "get_account",
        group: ToolGroup::Account,
        description: "Get account details: plan, render quota and usage.",
        folder_scoped_description: None,
        input_schema: object_schema(json!({}), &[]),
        handler: get_account,
    }]
}

fn get_account(ctx: &ToolContext, _args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move { ctx.resolver().execute(&RestCall::get("/v1/account")).await })
}

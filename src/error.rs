//! Tool-call error taxonomy
//!
//! Every variant is caught at the dispatch boundary and rendered as an
//! `isError: true` tool result. None of them is fatal to the process.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error(
        "No API key configured. Set TEMPLATED_API_KEY, pass --api-key, or send apiKey / Authorization: Bearer with the request."
    )]
    MissingApiKey,
    /// Downstream answered with a non-2xx status.
    #[error("API request failed with status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Request to the rendering API failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Object is missing or lives outside the configured folder / external id.
    /// Deliberately identical for both cases.
    #[error("{kind} {id} not found in the configured scope")]
    OutOfScope { kind: &'static str, id: String },
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    /// Phase two of a create/clone failed after the object already existed.
    #[error("Template {id} was created but {step} failed: {source}. {cleanup}")]
    ScopeAttach {
        id: String,
        step: &'static str,
        #[source]
        source: Box<ToolError>,
        cleanup: String,
    },
    /// Create/clone succeeded but the response named no id, so phase two
    /// could neither attach nor delete the new template.
    #[error(
        "A template was created but the response carried no id ({response}). It could not be attached to the configured scope and must be found and removed manually."
    )]
    UnidentifiedTemplate { response: String },
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        ToolError::InvalidArguments(e.to_string())
    }
}

pub type Result<T, E = ToolError> = std::result::Result<T, E>;

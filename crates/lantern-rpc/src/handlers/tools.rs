//! Tool handlers: list and call.
//!
//! Tool failures are results, not protocol errors: the call succeeds with
//! `isError: true` and a text item describing the problem.

use async_trait::async_trait;
use lantern_client::{format_chat, format_search, GleanError};
use serde_json::{json, Map, Value};
use tracing::{instrument, warn};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::require_string_param;
use crate::handlers::schemas::{self, CHAT_TOOL, SEARCH_TOOL};
use crate::registry::MethodHandler;

/// List the invocable tools.
pub struct ListToolsHandler;

#[async_trait]
impl MethodHandler for ListToolsHandler {
    async fn handle(&self, _params: Option<Value>, _ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(json!({ "tools": schemas::tool_catalog() }))
    }
}

/// Invoke a tool by name.
pub struct CallToolHandler;

#[async_trait]
impl MethodHandler for CallToolHandler {
    #[instrument(skip_all, fields(method = "tools/call", tool = tracing::field::Empty))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let name = require_string_param(params.as_ref(), "name")?;
        let _ = tracing::Span::current().record("tool", name.as_str());

        let Some(arguments) = params
            .as_ref()
            .and_then(|p| p.get("arguments"))
            .and_then(Value::as_object)
        else {
            return Ok(tool_error("Error: Arguments are required"));
        };

        let outcome = match name.as_str() {
            SEARCH_TOOL => run_search(arguments, ctx).await,
            CHAT_TOOL => run_chat(arguments, ctx).await,
            other => Err(ToolFailure::Other(format!("Unknown tool: {other}"))),
        };

        Ok(match outcome {
            Ok(text) => json!({
                "content": [{ "type": "text", "text": text }],
                "isError": false,
            }),
            Err(ToolFailure::Invalid(issues)) => tool_error(&format!("Invalid input:\n{}", issues.join("\n"))),
            Err(ToolFailure::Api(err)) => {
                warn!(tool = %name, error = %err, "knowledge index call failed");
                tool_error(&err.user_message())
            }
            Err(ToolFailure::Other(message)) => tool_error(&format!("Error: {message}")),
        })
    }
}

enum ToolFailure {
    Invalid(Vec<String>),
    Api(GleanError),
    Other(String),
}

impl From<GleanError> for ToolFailure {
    fn from(err: GleanError) -> Self {
        Self::Api(err)
    }
}

async fn run_search(arguments: &Map<String, Value>, ctx: &RpcContext) -> Result<String, ToolFailure> {
    let body = schemas::validate_search(arguments).map_err(ToolFailure::Invalid)?;
    let client = ctx.deps.client.as_ref().ok_or_else(not_configured)?;
    let response = client.search(&body, ctx.identity_override()).await?;
    Ok(format_search(&response))
}

async fn run_chat(arguments: &Map<String, Value>, ctx: &RpcContext) -> Result<String, ToolFailure> {
    let body = schemas::validate_chat(arguments).map_err(ToolFailure::Invalid)?;
    let client = ctx.deps.client.as_ref().ok_or_else(not_configured)?;
    let response = client.chat(&body, ctx.identity_override()).await?;
    Ok(format_chat(&response))
}

fn not_configured() -> ToolFailure {
    ToolFailure::Api(GleanError::NotConfigured(
        "set GLEAN_INSTANCE and GLEAN_API_TOKEN".to_string(),
    ))
}

fn tool_error(text: &str) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": true,
    })
}

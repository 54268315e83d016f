//! Lifecycle handlers: initialize, initialized, ping.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::registry::MethodHandler;

/// Protocol revision announced when the client names none.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Session handshake: announce capabilities and server identity.
pub struct InitializeHandler;

#[async_trait]
impl MethodHandler for InitializeHandler {
    #[instrument(skip_all, fields(method = "initialize"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let protocol_version = params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        debug!(protocol_version, session = ?ctx.request.session_id, "handshake");

        Ok(json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": ctx.deps.server_name,
                "version": ctx.deps.server_version,
            },
        }))
    }
}

/// Client acknowledgement of the handshake. Notification only.
pub struct InitializedHandler;

#[async_trait]
impl MethodHandler for InitializedHandler {
    async fn handle(&self, _params: Option<Value>, _ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(Value::Null)
    }
}

/// Liveness check.
pub struct PingHandler;

#[async_trait]
impl MethodHandler for PingHandler {
    async fn handle(&self, _params: Option<Value>, _ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(json!({}))
    }
}

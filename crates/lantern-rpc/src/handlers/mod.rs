//! Method handlers and registration.

pub mod schemas;
pub mod system;
pub mod tools;

use serde_json::Value;

use crate::errors::RpcError;
use crate::registry::MethodRegistry;

/// Register every handler with the registry.
pub fn register_all(registry: &mut MethodRegistry) {
    // Lifecycle
    registry.register("initialize", system::InitializeHandler);
    registry.register("notifications/initialized", system::InitializedHandler);
    registry.register("ping", system::PingHandler);

    // Tools
    registry.register("tools/list", tools::ListToolsHandler);
    registry.register("tools/call", tools::CallToolHandler);
}

/// Extract a required parameter.
pub(crate) fn require_param<'a>(params: Option<&'a Value>, key: &str) -> Result<&'a Value, RpcError> {
    params
        .and_then(|p| p.get(key))
        .ok_or_else(|| RpcError::InvalidParams {
            message: format!("Missing required parameter: {key}"),
        })
}

/// Extract a required string parameter.
pub(crate) fn require_string_param(params: Option<&Value>, key: &str) -> Result<String, RpcError> {
    require_param(params, key)?
        .as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| RpcError::InvalidParams {
            message: format!("Parameter '{key}' must be a string"),
        })
}

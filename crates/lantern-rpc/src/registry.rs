//! Method registry and async dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lantern_core::{Request, Response};
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::{error, warn};

use crate::context::RpcContext;
use crate::errors::RpcError;

/// Default maximum time a single handler may run.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(60);

/// Trait implemented by every method handler.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Execute the handler with the given params and context.
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError>;
}

/// Registry mapping method names to handlers.
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
    timeout: Duration,
}

impl MethodRegistry {
    /// Create an empty registry with the default handler timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_HANDLER_TIMEOUT)
    }

    /// Create an empty registry with a custom handler timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            handlers: HashMap::new(),
            timeout,
        }
    }

    /// Register a handler for a method name.
    pub fn register(&mut self, method: &str, handler: impl MethodHandler + 'static) {
        let _ = self.handlers.insert(method.to_owned(), Arc::new(handler));
    }

    /// Dispatch a request to its handler and build the response.
    pub async fn dispatch(&self, request: Request, ctx: &RpcContext) -> Response {
        let Request { id, method, params } = request;
        counter!("rpc_requests_total", "method" => method.clone()).increment(1);

        let Some(handler) = self.handlers.get(&method) else {
            counter!("rpc_errors_total", "method" => method.clone(), "error_type" => "method_not_found").increment(1);
            return Response::error(id, RpcError::MethodNotFound { method }.to_error_object());
        };

        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, handler.handle(params.map(Value::Object), ctx)).await;

        let response = match result {
            Ok(Ok(value)) => Response::success(id, value),
            Ok(Err(err)) => {
                counter!("rpc_errors_total", "method" => method.clone(), "error_type" => err.kind()).increment(1);
                if matches!(err, RpcError::Internal { .. }) {
                    error!(method, error = %err, "handler failed");
                }
                Response::error(id, err.to_error_object())
            }
            Err(_elapsed) => {
                counter!("rpc_errors_total", "method" => method.clone(), "error_type" => "timeout").increment(1);
                error!(method, "handler timed out after {:?}", self.timeout);
                let err = RpcError::Internal {
                    message: format!("Handler for '{method}' timed out"),
                };
                Response::error(id, err.to_error_object())
            }
        };

        let duration = start.elapsed();
        histogram!("rpc_request_duration_seconds", "method" => method.clone()).record(duration.as_secs_f64());
        if duration.as_secs() >= 5 {
            warn!(method, duration_secs = duration.as_secs_f64(), "slow request");
        }

        response
    }

    /// List all registered method names (sorted).
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

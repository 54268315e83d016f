//! Handler dependency-injection context.

use std::sync::Arc;

use lantern_client::KnowledgeClient;
use lantern_core::RequestContext;

/// Process-wide dependencies shared by every handler.
pub struct EngineDeps {
    /// Knowledge index client; `None` when credentials are not configured.
    pub client: Option<Arc<dyn KnowledgeClient>>,
    /// Name reported in the handshake result.
    pub server_name: String,
    /// Version reported in the handshake result.
    pub server_version: String,
}

impl EngineDeps {
    /// Dependencies with the crate's own name and version.
    pub fn new(client: Option<Arc<dyn KnowledgeClient>>) -> Self {
        Self {
            client,
            server_name: "lantern".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Context passed to every handler invocation.
pub struct RpcContext {
    /// Shared dependencies.
    pub deps: Arc<EngineDeps>,
    /// The transport-side context of this request.
    pub request: RequestContext,
}

impl RpcContext {
    /// Identity to act as for outbound calls made on this request's behalf.
    pub fn identity_override(&self) -> Option<&str> {
        self.request.identity_override.as_deref()
    }
}

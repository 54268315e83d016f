//! HTTP request gateway and server-push event streams.

pub mod gateway;
pub mod streaming;

/// Header carrying the session id on requests and handshake responses.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Header naming the identity to act as for knowledge-index calls.
pub const ACT_AS_HEADER: &str = "mcp-act-as";

/// Accept value that selects push delivery.
pub const EVENT_STREAM: &str = "text/event-stream";

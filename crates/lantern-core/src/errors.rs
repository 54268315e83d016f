//! JSON-RPC error codes and the standard error envelopes the transport emits.

use serde_json::Value;

use crate::envelope::{Envelope, ErrorObject, RequestId, Response};

// ── Error code constants ────────────────────────────────────────────

/// Malformed input.
pub const PARSE_ERROR: i64 = -32700;
/// Structurally valid JSON that is not a usable request.
pub const INVALID_REQUEST: i64 = -32600;
/// Method not found in the registry.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid or missing parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Unexpected internal error.
pub const INTERNAL_ERROR: i64 = -32603;
/// Session id missing, unknown, or idle-expired.
pub const INVALID_SESSION: i64 = -32000;
/// Handshake sent on a request that already names a session.
pub const SESSION_ALREADY_EXISTS: i64 = -32002;

/// Parse-error envelope listing each problem in `error.data`.
pub fn parse_error(issues: &[String]) -> Envelope {
    let data = Value::Array(issues.iter().cloned().map(Value::String).collect());
    Response::error(None, ErrorObject::new(PARSE_ERROR, "Parse error").with_data(data)).into()
}

/// Rejection of a second handshake.
pub fn session_already_exists(id: Option<RequestId>) -> Envelope {
    Response::error(id, ErrorObject::new(SESSION_ALREADY_EXISTS, "Session already exists")).into()
}

/// Missing or expired session.
pub fn invalid_session(id: Option<RequestId>) -> Envelope {
    Response::error(id, ErrorObject::new(INVALID_SESSION, "Invalid or expired session")).into()
}

/// Generic internal error; details stay in the server log.
pub fn internal_error(id: Option<RequestId>) -> Envelope {
    Response::error(id, ErrorObject::new(INTERNAL_ERROR, "Internal error")).into()
}

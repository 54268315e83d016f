//! `/health` endpoint.

use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    pub status: &'static str,
}

/// The fixed liveness payload. Reads no session state.
pub fn health_check() -> HealthResponse {
    HealthResponse { status: "healthy" }
}

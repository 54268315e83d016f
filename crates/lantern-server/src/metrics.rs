//! Prometheus recorder and the metric names used across the transport.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus recorder as the global recorder.
///
/// Call once at startup, before anything is recorded. The handle renders
/// the `/metrics` endpoint.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Sessions created (counter).
pub const SESSIONS_CREATED_TOTAL: &str = "sessions_created_total";
/// Sessions removed explicitly (counter).
pub const SESSIONS_REMOVED_TOTAL: &str = "sessions_removed_total";
/// Sessions evicted for idleness (counter).
pub const SESSIONS_EVICTED_TOTAL: &str = "sessions_evicted_total";
/// Registered sessions (gauge).
pub const SESSIONS_ACTIVE: &str = "sessions_active";
/// Time from creation to removal or eviction (histogram).
pub const SESSION_LIFETIME_SECONDS: &str = "session_lifetime_seconds";
/// Envelopes dropped because a push listener was full (counter).
pub const PUSH_DROPS_TOTAL: &str = "push_drops_total";
/// Socket connections opened (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Socket connections closed (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Open socket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Socket connection duration (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";

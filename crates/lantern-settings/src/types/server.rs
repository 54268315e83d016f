//! Transport and session settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Network transport settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port for HTTP, streaming, and socket connections.
    pub port: u16,
    /// Idle time after which a session is evicted, in milliseconds.
    /// Also the reaper's sweep period.
    pub session_timeout_ms: u64,
    /// Buffered envelopes per push listener before new ones are dropped.
    pub push_channel_capacity: usize,
    /// Keep-alive comment interval on event streams, in seconds.
    pub stream_keepalive_secs: u64,
    /// Ping interval on sockets, in seconds.
    pub socket_ping_interval_secs: u64,
    /// Largest accepted socket frame, in bytes.
    pub max_message_size: usize,
    /// Largest accepted POST body, in bytes.
    pub max_body_size: usize,
}

impl ServerSettings {
    /// Idle timeout as a [`Duration`].
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            session_timeout_ms: 1_800_000,
            push_channel_capacity: 256,
            stream_keepalive_secs: 15,
            socket_ping_interval_secs: 30,
            max_message_size: 4 * 1024 * 1024,
            max_body_size: 4 * 1024 * 1024,
        }
    }
}

/// Protocol engine settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Per-request handler deadline in milliseconds.
    pub handler_timeout_ms: u64,
    /// Inbound queue depth between transports and the engine.
    pub inbound_queue_capacity: usize,
}

impl EngineSettings {
    /// Handler deadline as a [`Duration`].
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            handler_timeout_ms: 60_000,
            inbound_queue_capacity: 1024,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// `compact` or `json`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

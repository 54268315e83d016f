//! Transport configuration.

use std::time::Duration;

use lantern_settings::ServerSettings;
use serde::{Deserialize, Serialize};

/// Configuration for the network transports.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (`0` auto-assigns).
    pub port: u16,
    /// Idle timeout in milliseconds; also the reaper period.
    pub session_timeout_ms: u64,
    /// Per-listener push buffer.
    pub push_channel_capacity: usize,
    /// Event-stream keep-alive interval in seconds.
    pub stream_keepalive_secs: u64,
    /// Socket ping interval in seconds.
    pub socket_ping_interval_secs: u64,
    /// Max socket message size in bytes.
    pub max_message_size: usize,
    /// Max POST body size in bytes.
    pub max_body_size: usize,
}

impl TransportConfig {
    /// Idle timeout.
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    /// Keep-alive interval for event streams.
    pub fn stream_keepalive(&self) -> Duration {
        Duration::from_secs(self.stream_keepalive_secs.max(1))
    }

    /// Ping interval for sockets.
    pub fn socket_ping_interval(&self) -> Duration {
        Duration::from_secs(self.socket_ping_interval_secs.max(1))
    }

    /// `host:port` bind string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<&ServerSettings> for TransportConfig {
    fn from(s: &ServerSettings) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            session_timeout_ms: s.session_timeout_ms,
            push_channel_capacity: s.push_channel_capacity,
            stream_keepalive_secs: s.stream_keepalive_secs,
            socket_ping_interval_secs: s.socket_ping_interval_secs,
            max_message_size: s.max_message_size,
            max_body_size: s.max_body_size,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 0,
            ..Self::from(&ServerSettings::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_is_zero() {
        let cfg = TransportConfig::default();
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.host, "127.0.0.1");
    }

    #[test]
    fn from_settings_copies_values() {
        let settings = ServerSettings {
            port: 8123,
            session_timeout_ms: 5_000,
            ..ServerSettings::default()
        };
        let cfg = TransportConfig::from(&settings);
        assert_eq!(cfg.port, 8123);
        assert_eq!(cfg.session_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8123");
    }

    #[test]
    fn intervals_never_zero() {
        let cfg = TransportConfig {
            stream_keepalive_secs: 0,
            socket_ping_interval_secs: 0,
            ..TransportConfig::default()
        };
        assert_eq!(cfg.stream_keepalive(), Duration::from_secs(1));
        assert_eq!(cfg.socket_ping_interval(), Duration::from_secs(1));
    }

    #[test]
    fn deserialize_from_json_string() {
        let json = r#"{"host":"0.0.0.0","port":9000,"session_timeout_ms":1000,"push_channel_capacity":4,"stream_keepalive_secs":5,"socket_ping_interval_secs":5,"max_message_size":512,"max_body_size":512}"#;
        let cfg: TransportConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.push_channel_capacity, 4);
    }
}

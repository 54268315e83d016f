//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`,
//! so a settings file may name only the fields it changes.

mod api;
mod server;

pub use api::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 8080, "sessionTimeoutMs": 600000 },
///   "api": { "instance": "acme" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanternSettings {
    /// Application name, reported in the handshake result.
    pub name: String,
    /// Network transport settings.
    pub server: ServerSettings,
    /// Knowledge index API settings.
    pub api: ApiSettings,
    /// Protocol engine settings.
    pub engine: EngineSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for LanternSettings {
    fn default() -> Self {
        Self {
            name: "lantern".to_string(),
            server: ServerSettings::default(),
            api: ApiSettings::default(),
            engine: EngineSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

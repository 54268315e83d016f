//! Knowledge index API settings.

use serde::{Deserialize, Serialize};

/// Credentials and addressing for the knowledge index.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// Instance name; the base URL is derived from it when `base_url` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Explicit base URL, e.g. `https://acme-be.glean.com`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Default identity to act as when a session carries none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub act_as: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl ApiSettings {
    /// Resolve the base URL, preferring the explicit setting.
    ///
    /// Trailing slashes are stripped. Returns `None` when neither the base
    /// URL nor the instance is configured.
    pub fn resolved_base_url(&self) -> Option<String> {
        if let Some(url) = self.base_url.as_deref().filter(|u| !u.is_empty()) {
            return Some(url.trim_end_matches('/').to_string());
        }
        self.instance
            .as_deref()
            .filter(|i| !i.is_empty())
            .map(|i| format!("https://{i}-be.glean.com"))
    }
}

//! HTTP client for the knowledge index.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lantern_settings::ApiSettings;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;

use crate::errors::{GleanError, Result};

/// Header naming the identity to act as.
pub const ACT_AS_HEADER: &str = "X-Scio-Actas";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Search and chat against a knowledge index.
///
/// `act_as` is the caller identity override for this one call; it is never
/// stored on the client.
#[async_trait]
pub trait KnowledgeClient: Send + Sync {
    /// Run a search request; returns the raw response body.
    async fn search(&self, request: &Value, act_as: Option<&str>) -> Result<Value>;

    /// Run a chat request; returns the raw response body.
    async fn chat(&self, request: &Value, act_as: Option<&str>) -> Result<Value>;
}

/// [`KnowledgeClient`] backed by the Glean REST API.
pub struct GleanClient {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    default_act_as: Option<String>,
}

impl std::fmt::Debug for GleanClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GleanClient")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field("default_act_as", &self.default_act_as)
            .finish_non_exhaustive()
    }
}

impl GleanClient {
    /// Build a client from explicit parts.
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            default_act_as: None,
        })
    }

    /// Build a client from settings.
    pub fn from_settings(settings: &ApiSettings) -> Result<Self> {
        let base_url = settings
            .resolved_base_url()
            .ok_or_else(|| GleanError::NotConfigured("instance or base URL".to_string()))?;
        let api_token = settings
            .api_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GleanError::NotConfigured("API token".to_string()))?;
        let timeout = settings.timeout_ms.map_or(DEFAULT_TIMEOUT, Duration::from_millis);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_token,
            default_act_as: settings.act_as.clone().filter(|a| !a.is_empty()),
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_headers(&self, act_as: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.api_token))
            .map_err(|e| GleanError::NotConfigured(format!("API token is not a valid header value: {e}")))?;
        let _ = headers.insert(AUTHORIZATION, auth);
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(identity) = act_as.or(self.default_act_as.as_deref()) {
            let value = HeaderValue::from_str(identity)
                .map_err(|e| GleanError::NotConfigured(format!("act-as identity is not a valid header value: {e}")))?;
            let _ = headers.insert(ACT_AS_HEADER, value);
        }
        Ok(headers)
    }

    async fn post(&self, endpoint: &str, body: &Value, act_as: Option<&str>) -> Result<Value> {
        let url = format!("{}/rest/api/v1/{endpoint}", self.base_url);
        debug!(%url, act_as = act_as.is_some(), "knowledge index request");

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers(act_as)?)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let reset = response
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let text = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "knowledge index error response");
            return Err(GleanError::from_status(status.as_u16(), text, reset.as_deref(), Utc::now()));
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl KnowledgeClient for GleanClient {
    async fn search(&self, request: &Value, act_as: Option<&str>) -> Result<Value> {
        self.post("search", request, act_as).await
    }

    async fn chat(&self, request: &Value, act_as: Option<&str>) -> Result<Value> {
        self.post("chat", request, act_as).await
    }
}

//! Knowledge index error taxonomy.
//!
//! HTTP failures are classified by status so callers can render a message
//! tailored to the failure category.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// Result type for knowledge index calls.
pub type Result<T> = std::result::Result<T, GleanError>;

/// Default wait when a 429 carries no reset header.
const DEFAULT_RATE_LIMIT_WAIT_SECS: i64 = 60;

/// Errors returned by the knowledge index client.
#[derive(Debug, thiserror::Error)]
pub enum GleanError {
    /// 400: the request was malformed.
    #[error("{message}")]
    InvalidRequest {
        /// Error description.
        message: String,
        /// Response body, parsed when it was JSON.
        response: Option<Value>,
    },

    /// 401: token missing, invalid, or expired.
    #[error("{message}")]
    Authentication {
        /// Error description.
        message: String,
    },

    /// 403: the token lacks access.
    #[error("{message}")]
    Permission {
        /// Error description.
        message: String,
    },

    /// 408: the index timed out.
    #[error("{message}")]
    Timeout {
        /// Error description.
        message: String,
    },

    /// 422: the query failed validation.
    #[error("{message}")]
    Validation {
        /// Error description.
        message: String,
        /// Response body, parsed when it was JSON.
        response: Option<Value>,
    },

    /// 429: rate limited.
    #[error("{message}")]
    RateLimit {
        /// Error description.
        message: String,
        /// When the limit resets.
        reset_at: DateTime<Utc>,
    },

    /// Any other non-success status.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Raw response body.
        body: String,
    },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Client settings are incomplete.
    #[error("knowledge index not configured: {0}")]
    NotConfigured(String),
}

impl GleanError {
    /// Classify a non-success HTTP response.
    ///
    /// `reset_header` is the raw `X-RateLimit-Reset` value (unix seconds).
    pub fn from_status(status: u16, body: String, reset_header: Option<&str>, now: DateTime<Utc>) -> Self {
        let parsed = || serde_json::from_str::<Value>(&body).ok();
        match status {
            400 => Self::InvalidRequest {
                message: "Invalid request".to_string(),
                response: parsed(),
            },
            401 => {
                let message = if body.contains("Token has expired") {
                    "Authentication token has expired"
                } else {
                    "Invalid authentication token"
                };
                Self::Authentication {
                    message: message.to_string(),
                }
            }
            403 => Self::Permission {
                message: "You do not have permission to access this resource".to_string(),
            },
            408 => Self::Timeout {
                message: "Request timeout".to_string(),
            },
            422 => Self::Validation {
                message: "Invalid query".to_string(),
                response: parsed(),
            },
            429 => {
                let reset_at = reset_header
                    .and_then(|v| v.trim().parse::<i64>().ok())
                    .and_then(|secs| DateTime::from_timestamp(secs, 0))
                    .unwrap_or_else(|| now + Duration::seconds(DEFAULT_RATE_LIMIT_WAIT_SECS));
                Self::RateLimit {
                    message: "Too many requests".to_string(),
                    reset_at,
                }
            }
            _ => {
                let reason = reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown Error");
                Self::Api {
                    status,
                    message: format!("Glean API error: {reason}"),
                    body,
                }
            }
        }
    }

    /// Human-readable rendering returned to clients as tool output.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest { message, response } => with_details("Invalid Request", message, response.as_ref()),
            Self::Authentication { message } => format!("Authentication Failed: {message}"),
            Self::Permission { message } => format!("Permission Denied: {message}"),
            Self::Timeout { message } => format!("Request Timeout: {message}"),
            Self::Validation { message, response } => with_details("Invalid Query", message, response.as_ref()),
            Self::RateLimit { message, reset_at } => {
                format!("Rate Limit Exceeded: {message}\nResets at: {}", reset_at.to_rfc3339())
            }
            Self::Api { message, .. } => format!("Glean API Error: {message}"),
            Self::Network(e) => format!("Glean API Error: network error: {e}"),
            Self::NotConfigured(what) => format!("Glean API Error: not configured: {what}"),
        }
    }
}

fn with_details(label: &str, message: &str, response: Option<&Value>) -> String {
    match response {
        Some(details) => format!("{label}: {message}\nDetails: {details}"),
        None => format!("{label}: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn expired_token_is_distinguished() {
        let err = GleanError::from_status(401, "Token has expired\nNot allowed".into(), None, now());
        assert_eq!(err.to_string(), "Authentication token has expired");
        let err = GleanError::from_status(401, "Invalid Secret\nNot allowed".into(), None, now());
        assert_eq!(err.to_string(), "Invalid authentication token");
    }

    #[test]
    fn server_error_uses_canonical_reason() {
        let err = GleanError::from_status(500, "Something went wrong".into(), None, now());
        assert_eq!(err.to_string(), "Glean API error: Internal Server Error");
        assert_matches!(err, GleanError::Api { status: 500, ref body, .. } if body == "Something went wrong");
    }

    #[test]
    fn rate_limit_reads_reset_header() {
        let err = GleanError::from_status(429, String::new(), Some("1700000500"), now());
        assert_matches!(err, GleanError::RateLimit { reset_at, .. } if reset_at.timestamp() == 1_700_000_500);
    }

    #[test]
    fn rate_limit_defaults_to_one_minute() {
        let err = GleanError::from_status(429, String::new(), Some("garbage"), now());
        assert_matches!(err, GleanError::RateLimit { reset_at, .. } if reset_at.timestamp() == 1_700_000_060);
    }

    #[test]
    fn categories_by_status() {
        assert_matches!(GleanError::from_status(400, "{}".into(), None, now()), GleanError::InvalidRequest { response: Some(_), .. });
        assert_matches!(GleanError::from_status(403, String::new(), None, now()), GleanError::Permission { .. });
        assert_matches!(GleanError::from_status(408, String::new(), None, now()), GleanError::Timeout { .. });
        assert_matches!(GleanError::from_status(422, "not json".into(), None, now()), GleanError::Validation { response: None, .. });
    }

    #[test]
    fn user_message_includes_details() {
        let err = GleanError::from_status(422, r#"{"field":"query"}"#.into(), None, now());
        assert_eq!(err.user_message(), "Invalid Query: Invalid query\nDetails: {\"field\":\"query\"}");
    }

    #[test]
    fn user_message_for_rate_limit_has_reset() {
        let err = GleanError::from_status(429, String::new(), Some("1700000500"), now());
        assert!(err.user_message().starts_with("Rate Limit Exceeded: Too many requests\nResets at: 2023-11-14T"));
    }
}

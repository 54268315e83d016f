//! RPC error type returned by handlers.

use lantern_core::errors::{INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND};
use lantern_core::ErrorObject;

/// Handler failure, mapped onto a JSON-RPC error object.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Required parameter missing or wrong type.
    #[error("{message}")]
    InvalidParams {
        /// Description of what is wrong.
        message: String,
    },

    /// Envelope was well formed but unusable.
    #[error("{message}")]
    InvalidRequest {
        /// Description.
        message: String,
    },

    /// No handler registered for the method.
    #[error("Method '{method}' not found")]
    MethodNotFound {
        /// The requested method.
        method: String,
    },

    /// Internal server error.
    #[error("{message}")]
    Internal {
        /// Description.
        message: String,
    },
}

impl RpcError {
    /// JSON-RPC error code for this variant.
    pub fn code(&self) -> i64 {
        match self {
            Self::InvalidParams { .. } => INVALID_PARAMS,
            Self::InvalidRequest { .. } => INVALID_REQUEST,
            Self::MethodNotFound { .. } => METHOD_NOT_FOUND,
            Self::Internal { .. } => INTERNAL_ERROR,
        }
    }

    /// Short label used in error metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParams { .. } => "invalid_params",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::MethodNotFound { .. } => "method_not_found",
            Self::Internal { .. } => "internal",
        }
    }

    /// Convert to the wire-format error object.
    pub fn to_error_object(&self) -> ErrorObject {
        ErrorObject::new(self.code(), self.to_string())
    }
}

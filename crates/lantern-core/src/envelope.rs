//! JSON-RPC 2.0 envelope types.
//!
//! Envelopes are immutable once built. Inbound envelopes are produced only by
//! [`crate::codec::decode`], which enforces the structural invariants; the
//! constructors here are for envelopes the server builds itself.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Protocol marker carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Method name of the session handshake.
pub const HANDSHAKE_METHOD: &str = "initialize";

/// Correlation id: a string or an integer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Integer id.
    Number(i64),
    /// String id.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

/// Structured error carried by an error response.
#[derive(Clone, Debug, PartialEq, serde::Serialize, Deserialize)]
pub struct ErrorObject {
    /// JSON-RPC error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    /// Build an error without details.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Request direction: an operation name plus arguments.
///
/// A request without an id is a notification.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    /// Correlation id (absent for notifications).
    pub id: Option<RequestId>,
    /// Operation name.
    pub method: String,
    /// Operation arguments.
    pub params: Option<Map<String, Value>>,
}

impl Request {
    /// Build a request that expects a reply.
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Map<String, Value>>) -> Self {
        Self {
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Build a notification (no correlation id).
    pub fn notification(method: impl Into<String>, params: Option<Map<String, Value>>) -> Self {
        Self {
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Whether this is the session handshake.
    pub fn is_handshake(&self) -> bool {
        self.method == HANDSHAKE_METHOD
    }

    /// Whether a reply is expected.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Response payload: exactly one of result or error.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Successful result.
    Result(Value),
    /// Failure.
    Error(ErrorObject),
}

/// Response direction.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// Echoed correlation id (absent when the request could not be read).
    pub id: Option<RequestId>,
    /// Result or error.
    pub outcome: Outcome,
}

impl Response {
    /// Build a success response.
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            id,
            outcome: Outcome::Result(result),
        }
    }

    /// Build an error response.
    pub fn error(id: Option<RequestId>, error: ErrorObject) -> Self {
        Self {
            id,
            outcome: Outcome::Error(error),
        }
    }

    /// The error, if this is an error response.
    pub fn error_object(&self) -> Option<&ErrorObject> {
        match &self.outcome {
            Outcome::Error(e) => Some(e),
            Outcome::Result(_) => None,
        }
    }
}

/// One message unit exchanged between client and server.
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    /// Operation call or notification.
    Request(Request),
    /// Result or error.
    Response(Response),
}

impl Envelope {
    /// Correlation id, if any.
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(r) => r.id.as_ref(),
            Self::Response(r) => r.id.as_ref(),
        }
    }

    /// Method name for requests.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(r.method.as_str()),
            Self::Response(_) => None,
        }
    }

    /// Whether this is the session handshake.
    pub fn is_handshake(&self) -> bool {
        matches!(self, Self::Request(r) if r.is_handshake())
    }
}

impl From<Request> for Envelope {
    fn from(r: Request) -> Self {
        Self::Request(r)
    }
}

impl From<Response> for Envelope {
    fn from(r: Response) -> Self {
        Self::Response(r)
    }
}

impl Serialize for Request {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
        if let Some(id) = &self.id {
            map.serialize_entry("id", id)?;
        }
        map.serialize_entry("method", &self.method)?;
        if let Some(params) = &self.params {
            map.serialize_entry("params", params)?;
        }
        map.end()
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
        // Responses always carry an id; `null` when it could not be determined.
        map.serialize_entry("id", &self.id)?;
        match &self.outcome {
            Outcome::Result(v) => map.serialize_entry("result", v)?,
            Outcome::Error(e) => map.serialize_entry("error", e)?,
        }
        map.end()
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Request(r) => r.serialize(serializer),
            Self::Response(r) => r.serialize(serializer),
        }
    }
}

//! Envelope codec and structural validator.
//!
//! [`decode`] never panics: any malformed input yields a [`ParseFailure`]
//! listing every problem found, which the caller turns into a parse-error
//! envelope with [`ParseFailure::to_envelope`].

use serde_json::{Map, Value};

use crate::envelope::{
    Envelope, ErrorObject, Outcome, Request, RequestId, Response, JSONRPC_VERSION,
};
use crate::errors;

/// Structured parse failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("parse error: {}", issues.join("; "))]
pub struct ParseFailure {
    /// Human-readable description of each problem.
    pub issues: Vec<String>,
}

impl ParseFailure {
    fn single(issue: impl Into<String>) -> Self {
        Self {
            issues: vec![issue.into()],
        }
    }

    /// Build the parse-error envelope sent back to the client.
    pub fn to_envelope(&self) -> Envelope {
        errors::parse_error(&self.issues)
    }
}

/// Decode raw bytes into a validated envelope.
pub fn decode(raw: &[u8]) -> Result<Envelope, ParseFailure> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| ParseFailure::single(format!("invalid JSON: {e}")))?;
    decode_value(value)
}

/// Decode a text frame into a validated envelope.
pub fn decode_str(raw: &str) -> Result<Envelope, ParseFailure> {
    decode(raw.as_bytes())
}

/// Validate an already-parsed JSON value.
pub fn decode_value(value: Value) -> Result<Envelope, ParseFailure> {
    let Value::Object(mut obj) = value else {
        return Err(ParseFailure::single("envelope must be a JSON object"));
    };

    let mut issues = Vec::new();

    match obj.remove("jsonrpc") {
        Some(Value::String(v)) if v == JSONRPC_VERSION => {}
        Some(_) => issues.push(format!("jsonrpc: expected \"{JSONRPC_VERSION}\"")),
        None => issues.push("jsonrpc: required".to_owned()),
    }

    let id = match obj.remove("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(RequestId::String(s)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(n) => Some(RequestId::Number(n)),
            None => {
                issues.push("id: expected string or integer".to_owned());
                None
            }
        },
        Some(_) => {
            issues.push("id: expected string or integer".to_owned());
            None
        }
    };

    let method = obj.remove("method");
    let params = obj.remove("params");
    let result = obj.remove("result");
    let error = obj.remove("error");

    let envelope = if let Some(method) = method {
        decode_request(id, method, params, result.is_some() || error.is_some(), &mut issues)
    } else {
        decode_response(id, result, error, &mut issues)
    };

    match envelope {
        Some(envelope) if issues.is_empty() => Ok(envelope),
        _ => Err(ParseFailure { issues }),
    }
}

fn decode_request(
    id: Option<RequestId>,
    method: Value,
    params: Option<Value>,
    carries_outcome: bool,
    issues: &mut Vec<String>,
) -> Option<Envelope> {
    if carries_outcome {
        issues.push("request must not carry result or error".to_owned());
    }
    let params = match params {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            issues.push("params: expected object".to_owned());
            None
        }
    };
    match method {
        Value::String(method) if !method.is_empty() => Some(Envelope::Request(Request {
            id,
            method,
            params,
        })),
        Value::String(_) => {
            issues.push("method: must not be empty".to_owned());
            None
        }
        _ => {
            issues.push("method: expected string".to_owned());
            None
        }
    }
}

fn decode_response(
    id: Option<RequestId>,
    result: Option<Value>,
    error: Option<Value>,
    issues: &mut Vec<String>,
) -> Option<Envelope> {
    let outcome = match (result, error) {
        (Some(result), None) => Outcome::Result(result),
        (None, Some(Value::Object(error))) => Outcome::Error(decode_error_object(error, issues)?),
        (None, Some(_)) => {
            issues.push("error: expected object".to_owned());
            return None;
        }
        (Some(_), Some(_)) => {
            issues.push("response must carry exactly one of result or error".to_owned());
            return None;
        }
        (None, None) => {
            issues.push("envelope must carry method, result, or error".to_owned());
            return None;
        }
    };
    Some(Envelope::Response(Response { id, outcome }))
}

fn decode_error_object(mut error: Map<String, Value>, issues: &mut Vec<String>) -> Option<ErrorObject> {
    let code = error.get("code").and_then(Value::as_i64);
    let message = match error.remove("message") {
        Some(Value::String(m)) => Some(m),
        _ => None,
    };
    if code.is_none() {
        issues.push("error.code: expected integer".to_owned());
    }
    if message.is_none() {
        issues.push("error.message: expected string".to_owned());
    }
    Some(ErrorObject {
        code: code?,
        message: message?,
        data: error.remove("data"),
    })
}

/// Encode an envelope as compact JSON.
pub fn encode(envelope: &Envelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(envelope)
}

//! `/transport` request handlers.
//!
//! POST routes one envelope: a handshake without a session creates one, any
//! other envelope needs a live session. Accepted envelopes are queued for the
//! engine and answered `202`; the result arrives later on a push channel.
//! A POST that accepts an event stream is answered with that stream instead.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use lantern_core::errors;
use lantern_core::{decode, ChannelKind, Envelope, Inbound, ParseFailure, RequestId, SessionId};
use tracing::{debug, info, warn};

use super::streaming::PushStream;
use super::{ACT_AS_HEADER, EVENT_STREAM, SESSION_HEADER};
use crate::facade::Transport;
use crate::websocket;

/// Terminal outcome for a call that is not accepted.
#[derive(Debug)]
pub enum Rejection {
    /// Body is not a valid envelope.
    Parse(ParseFailure),
    /// Handshake sent with a session id.
    SessionExists(Option<RequestId>),
    /// Session id missing, unknown, or expired.
    InvalidSession(Option<RequestId>),
    /// The engine could not take the envelope.
    Internal(Option<RequestId>),
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let (status, envelope) = match self {
            Self::Parse(failure) => (StatusCode::BAD_REQUEST, failure.to_envelope()),
            Self::SessionExists(id) => (StatusCode::BAD_REQUEST, errors::session_already_exists(id)),
            Self::InvalidSession(id) => (StatusCode::NOT_FOUND, errors::invalid_session(id)),
            Self::Internal(id) => (StatusCode::INTERNAL_SERVER_ERROR, errors::internal_error(id)),
        };
        (status, Json(envelope)).into_response()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn session_header(headers: &HeaderMap) -> Option<SessionId> {
    header_str(headers, SESSION_HEADER).map(SessionId::from_raw)
}

fn act_as_header(headers: &HeaderMap) -> Option<String> {
    header_str(headers, ACT_AS_HEADER).map(str::to_owned)
}

fn wants_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains(EVENT_STREAM))
}

fn is_socket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

fn accepted(session_id: &SessionId) -> Response {
    (StatusCode::ACCEPTED, [(SESSION_HEADER, session_id.to_string())]).into_response()
}

/// `POST /transport`
pub async fn post_transport(
    State(transport): State<Arc<Transport>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Rejection> {
    let envelope = decode(&body).map_err(|failure| {
        debug!(issues = ?failure.issues, "rejecting malformed envelope");
        Rejection::Parse(failure)
    })?;
    let request_id = envelope.id().cloned();
    let registry = transport.registry();

    if envelope.is_handshake() {
        if session_header(&headers).is_some() {
            return Err(Rejection::SessionExists(request_id));
        }
        let session_id = registry.create(act_as_header(&headers));
        let context = transport.context_for(&session_id, ChannelKind::Http);
        if transport.deliver(Inbound { context, envelope }).await.is_err() {
            let _ = registry.remove(&session_id);
            return Err(Rejection::Internal(request_id));
        }
        info!(session_id = %session_id, "session initialized");
        return Ok(accepted(&session_id));
    }

    let session_id = session_header(&headers)
        .filter(|id| registry.is_live(id))
        .ok_or(Rejection::InvalidSession(request_id.clone()))?;

    if let Some(identity) = act_as_header(&headers) {
        let _ = registry.set_identity_override(&session_id, Some(identity));
    }
    registry.touch(&session_id);

    if wants_stream(&headers) {
        // Subscribe before forwarding so the reply cannot outrun the listener.
        let push = PushStream::subscribe(&transport, &session_id)
            .ok_or(Rejection::InvalidSession(request_id.clone()))?;
        forward(&transport, &session_id, ChannelKind::Stream, envelope, request_id).await?;
        let sse = push.into_sse(&transport);
        return Ok(([(SESSION_HEADER, session_id.to_string())], sse).into_response());
    }

    forward(&transport, &session_id, ChannelKind::Http, envelope, request_id).await?;
    Ok(accepted(&session_id))
}

async fn forward(
    transport: &Transport,
    session_id: &SessionId,
    channel: ChannelKind,
    envelope: Envelope,
    request_id: Option<RequestId>,
) -> Result<(), Rejection> {
    let context = transport.context_for(session_id, channel);
    transport
        .deliver(Inbound { context, envelope })
        .await
        .map_err(|e| {
            warn!(session_id = %session_id, error = %e, "failed to forward envelope");
            Rejection::Internal(request_id)
        })
}

/// `GET /transport`
///
/// A socket upgrade opens a socket session. Otherwise the request must name
/// a session and accept an event stream; it then becomes that session's push
/// channel.
pub async fn get_transport(State(transport): State<Arc<Transport>>, request: Request) -> Response {
    if is_socket_upgrade(request.headers()) {
        let identity = act_as_header(request.headers());
        let (mut parts, _body) = request.into_parts();
        return match WebSocketUpgrade::from_request_parts(&mut parts, &transport).await {
            Ok(upgrade) => websocket::upgrade(upgrade, transport, identity),
            Err(rejection) => rejection.into_response(),
        };
    }

    let headers = request.headers();
    let Some(session_id) = session_header(headers).filter(|_| wants_stream(headers)) else {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    };
    let registry = transport.registry();
    if !registry.is_live(&session_id) {
        return Rejection::InvalidSession(None).into_response();
    }
    if let Some(identity) = act_as_header(headers) {
        let _ = registry.set_identity_override(&session_id, Some(identity));
    }
    registry.touch(&session_id);

    match PushStream::subscribe(&transport, &session_id) {
        Some(push) => {
            debug!(session_id = %session_id, "event stream opened");
            push.into_sse(&transport).into_response()
        }
        None => Rejection::InvalidSession(None).into_response(),
    }
}

/// `DELETE /transport`
pub async fn delete_transport(State(transport): State<Arc<Transport>>, headers: HeaderMap) -> Response {
    match session_header(&headers) {
        Some(session_id) if transport.registry().remove(&session_id) => {
            info!(session_id = %session_id, "session terminated");
            StatusCode::NO_CONTENT.into_response()
        }
        _ => Rejection::InvalidSession(None).into_response(),
    }
}

//! Socket session lifecycle, from upgrade through disconnect.
//!
//! 1. Creates a session and announces its id as the first frame
//! 2. Relays text and binary frames to the engine as envelopes
//! 3. Forwards the session's outbound envelopes and periodic pings
//! 4. Removes the session when the socket closes

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use lantern_core::errors;
use lantern_core::{decode, encode, ChannelKind, Envelope, Inbound, Request, SessionId};
use metrics::{counter, gauge, histogram};
use parking_lot::Mutex;
use serde_json::{json, Map};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::facade::Transport;
use crate::metrics::{
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_CONNECTION_DURATION_SECONDS, WS_DISCONNECTIONS_TOTAL,
};
use crate::session::Payload;

/// Method of the first frame sent on every socket.
pub const SESSION_ANNOUNCEMENT: &str = "notifications/session";

/// Error frames queued by the inbound loop.
const REPLY_BUFFER: usize = 32;

/// How long the forwarder gets to flush after the inbound side ends.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Accept an upgrade and run the socket session.
pub fn upgrade(upgrade: WebSocketUpgrade, transport: Arc<Transport>, identity_override: Option<String>) -> Response {
    let max = transport.config().max_message_size;
    upgrade
        .max_message_size(max)
        .on_upgrade(move |ws| run_socket_session(ws, transport, identity_override))
}

/// The session-announcement frame.
pub fn announcement(session_id: &SessionId) -> Result<String, serde_json::Error> {
    let mut params = Map::new();
    let _ = params.insert("sessionId".into(), json!(session_id));
    encode(&Request::notification(SESSION_ANNOUNCEMENT, Some(params)).into())
}

/// Pong bookkeeping shared by the reader and the forwarder.
struct Heartbeat {
    last_pong: Mutex<Instant>,
}

impl Heartbeat {
    fn new() -> Self {
        Self {
            last_pong: Mutex::new(Instant::now()),
        }
    }

    fn mark_alive(&self) {
        *self.last_pong.lock() = Instant::now();
    }

    fn since_last_pong(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }
}

fn queue_reply(tx: &mpsc::Sender<Payload>, envelope: &Envelope) {
    match encode(envelope) {
        Ok(text) => {
            if tx.try_send(text.into()).is_err() {
                warn!("socket reply queue full, dropping error frame");
            }
        }
        Err(e) => warn!(error = %e, "failed to encode error frame"),
    }
}

/// Run a socket session for a connected peer.
#[instrument(skip_all, fields(session_id = tracing::field::Empty))]
pub async fn run_socket_session(ws: WebSocket, transport: Arc<Transport>, identity_override: Option<String>) {
    let registry = Arc::clone(transport.registry());
    let session_id = registry.create(identity_override);
    let _ = tracing::Span::current().record("session_id", tracing::field::display(&session_id));

    let (mut ws_tx, mut ws_rx) = ws.split();
    let Some((_listener, mut push_rx)) = registry.subscribe(&session_id) else {
        return;
    };

    let announced = match announcement(&session_id) {
        Ok(text) => ws_tx.send(Message::Text(text.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "failed to encode session announcement");
            false
        }
    };
    if !announced {
        let _ = registry.remove(&session_id);
        return;
    }
    info!("socket connected");
    let connection_start = Instant::now();
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let (reply_tx, mut reply_rx) = mpsc::channel::<Payload>(REPLY_BUFFER);
    let heartbeat = Arc::new(Heartbeat::new());
    let ping_every = transport.config().socket_ping_interval();
    let pong_timeout = ping_every * 2;

    // Outbound forwarder: error frames, pushed envelopes, and pings.
    let outbound_heartbeat = Arc::clone(&heartbeat);
    let mut outbound = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_every);
        // Skip the immediate first tick
        let _ = ping.tick().await;
        let mut push_open = true;

        loop {
            let text = tokio::select! {
                msg = reply_rx.recv() => match msg {
                    Some(text) => text,
                    None => break,
                },
                msg = push_rx.recv(), if push_open => match msg {
                    Some(text) => text,
                    None => {
                        push_open = false;
                        continue;
                    }
                },
                _ = ping.tick() => {
                    if outbound_heartbeat.since_last_pong() > pong_timeout {
                        warn!("peer unresponsive for {pong_timeout:?}, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                    continue;
                }
            };
            if ws_tx.send(Message::Text((&*text).into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    let cancel = transport.cancel_token().clone();
    loop {
        let msg = tokio::select! {
            () = cancel.cancelled() => break,
            _ = &mut outbound => {
                debug!("forwarder ended");
                break;
            }
            msg = ws_rx.next() => match msg {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    debug!(error = %e, "socket read failed");
                    break;
                }
                None => break,
            },
        };

        let frame: &[u8] = match &msg {
            Message::Text(text) => text.as_str().as_bytes(),
            Message::Binary(data) => data.as_ref(),
            Message::Close(_) => {
                debug!("peer sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                heartbeat.mark_alive();
                continue;
            }
        };

        if !registry.is_live(&session_id) {
            queue_reply(&reply_tx, &errors::invalid_session(None));
            break;
        }

        let envelope = match decode(frame) {
            Ok(envelope) => envelope,
            Err(failure) => {
                debug!(issues = ?failure.issues, "rejecting malformed frame");
                queue_reply(&reply_tx, &failure.to_envelope());
                continue;
            }
        };

        registry.touch(&session_id);
        let request_id = envelope.id().cloned();
        let context = transport.context_for(&session_id, ChannelKind::Socket);
        if let Err(e) = transport.deliver(Inbound { context, envelope }).await {
            warn!(error = %e, "failed to forward frame");
            queue_reply(&reply_tx, &errors::internal_error(request_id));
        }
    }

    // Clean up
    drop(reply_tx);
    let _ = registry.remove(&session_id);
    if !outbound.is_finished() && tokio::time::timeout(FLUSH_TIMEOUT, &mut outbound).await.is_err() {
        outbound.abort();
    }
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection_start.elapsed().as_secs_f64());
    info!("socket disconnected");
}

//! Server-push event stream bound to one session.
//!
//! Each envelope pushed to the session becomes one `message` event whose data
//! is the encoded envelope. The stream ends when the session is removed or
//! the server shuts down; a client disconnect only detaches the listener.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use lantern_core::SessionId;
use tokio::sync::mpsc;
use tracing::debug;

use crate::facade::Transport;
use crate::session::{ListenerId, Payload, SessionRegistry};

/// Event name used for every pushed envelope.
pub const MESSAGE_EVENT: &str = "message";

static EVENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_event_id() -> String {
    EVENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed).to_string()
}

/// Detaches the listener when the response body is dropped.
struct ListenerGuard {
    registry: Arc<SessionRegistry>,
    session_id: SessionId,
    listener: ListenerId,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.registry.unsubscribe(&self.session_id, self.listener);
        debug!(session_id = %self.session_id, "event stream closed");
    }
}

/// A subscribed listener waiting to be turned into a response.
pub struct PushStream {
    guard: ListenerGuard,
    rx: mpsc::Receiver<Payload>,
}

impl PushStream {
    /// Attach a listener to a session. `None` if the session is unknown.
    pub fn subscribe(transport: &Transport, session_id: &SessionId) -> Option<Self> {
        let registry = Arc::clone(transport.registry());
        let (listener, rx) = registry.subscribe(session_id)?;
        Some(Self {
            guard: ListenerGuard {
                registry,
                session_id: session_id.clone(),
                listener,
            },
            rx,
        })
    }

    /// Convert into an SSE response body.
    pub fn into_sse(self, transport: &Transport) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
        let Self { guard, mut rx } = self;
        let cancel = transport.cancel_token().clone();
        let keepalive = transport.config().stream_keepalive();

        let stream = async_stream::stream! {
            let _guard = guard;
            loop {
                let payload = tokio::select! {
                    () = cancel.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Some(payload) => payload,
                        None => break,
                    },
                };
                yield Ok(Event::default()
                    .event(MESSAGE_EVENT)
                    .data(&*payload)
                    .id(next_event_id()));
            }
        };

        Sse::new(stream).keep_alive(KeepAlive::new().interval(keepalive))
    }
}

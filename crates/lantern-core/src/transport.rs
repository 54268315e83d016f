//! The seam between transports and the protocol engine.
//!
//! Transports hand decoded envelopes to the engine as [`Inbound`] values and
//! receive replies back through an [`OutboundSink`]. Neither side knows how
//! the other is implemented.

use crate::envelope::Envelope;
use crate::ids::SessionId;

/// Channel an inbound envelope arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    /// Plain request/response POST.
    Http,
    /// POST or GET answered with an event stream.
    Stream,
    /// Bidirectional socket.
    Socket,
    /// Line-delimited stdin/stdout.
    Stdio,
}

/// Per-request context threaded from the transport to the engine.
#[derive(Clone, Debug)]
pub struct RequestContext {
    /// Session that produced the request, if any.
    pub session_id: Option<SessionId>,
    /// Identity to act as for outbound calls made on this request's behalf.
    pub identity_override: Option<String>,
    /// Arrival channel.
    pub channel: ChannelKind,
}

impl RequestContext {
    /// Context for a request that belongs to no session.
    pub fn detached(channel: ChannelKind) -> Self {
        Self {
            session_id: None,
            identity_override: None,
            channel,
        }
    }
}

/// Decoded envelope travelling from a transport to the engine.
#[derive(Clone, Debug)]
pub struct Inbound {
    /// Where it came from.
    pub context: RequestContext,
    /// The validated envelope.
    pub envelope: Envelope,
}

/// Envelope travelling from the engine back to clients.
#[derive(Clone, Debug)]
pub struct Outbound {
    /// Target session; `None` broadcasts to every session.
    pub session_id: Option<SessionId>,
    /// The envelope to deliver.
    pub envelope: Envelope,
}

impl Outbound {
    /// Deliver to one session.
    pub fn to_session(session_id: SessionId, envelope: Envelope) -> Self {
        Self {
            session_id: Some(session_id),
            envelope,
        }
    }

    /// Deliver to every session.
    pub fn broadcast(envelope: Envelope) -> Self {
        Self {
            session_id: None,
            envelope,
        }
    }
}

/// Receiver of engine output.
///
/// `emit` must not block: implementations enqueue and return.
pub trait OutboundSink: Send + Sync {
    /// Deliver one outbound envelope.
    fn emit(&self, outbound: Outbound);
}

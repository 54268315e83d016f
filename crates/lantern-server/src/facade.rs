//! The transport facade: the only thing the protocol engine talks to.
//!
//! Owns the session registry and the engine's inbound queue. Channels call
//! [`Transport::deliver`] for each routed envelope; the engine calls
//! [`OutboundSink::emit`] with each reply, which is encoded once and pushed
//! to the listeners of the originating session.

use std::sync::Arc;

use lantern_core::{encode, ChannelKind, Inbound, Outbound, OutboundSink, RequestContext, SessionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::TransportConfig;
use crate::errors::{Result, TransportError};
use crate::session::{spawn_reaper, Payload, SessionRegistry};

/// Shared transport state handed to every channel.
pub struct Transport {
    registry: Arc<SessionRegistry>,
    inbound_tx: mpsc::Sender<Inbound>,
    config: TransportConfig,
    cancel: CancellationToken,
}

impl Transport {
    /// Build the facade around the engine's inbound queue.
    pub fn new(config: TransportConfig, inbound_tx: mpsc::Sender<Inbound>, cancel: CancellationToken) -> Self {
        let registry = Arc::new(SessionRegistry::new(
            config.session_timeout(),
            config.push_channel_capacity,
        ));
        Self {
            registry,
            inbound_tx,
            config,
            cancel,
        }
    }

    /// The session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Token that fires on shutdown; long-lived channels end when it does.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Request context for an envelope addressed to `session_id`.
    ///
    /// Carries the session's current identity override.
    pub fn context_for(&self, session_id: &SessionId, channel: ChannelKind) -> RequestContext {
        let identity_override = self
            .registry
            .get(session_id)
            .and_then(|s| s.identity_override);
        RequestContext {
            session_id: Some(session_id.clone()),
            identity_override,
            channel,
        }
    }

    /// Hand one routed envelope to the engine.
    ///
    /// Waits for queue space, preserving arrival order.
    pub async fn deliver(&self, inbound: Inbound) -> Result<()> {
        self.inbound_tx.send(inbound).await.map_err(|_| {
            error!("engine inbound queue closed");
            TransportError::EngineClosed
        })
    }

    /// Start the idle-session sweep.
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        spawn_reaper(Arc::clone(&self.registry), self.cancel.clone())
    }
}

impl OutboundSink for Transport {
    fn emit(&self, outbound: Outbound) {
        let payload: Payload = match encode(&outbound.envelope) {
            Ok(json) => json.into(),
            Err(e) => {
                warn!(error = %e, "failed to encode outbound envelope");
                return;
            }
        };
        let delivered = match &outbound.session_id {
            Some(id) => self.registry.notify(id, &payload),
            None => self.registry.notify_all(&payload),
        };
        if delivered == 0 {
            debug!(session_id = ?outbound.session_id, "no listener for outbound envelope");
        }
    }
}

//! Engine loop: consumes inbound envelopes, emits replies.
//!
//! Inbound envelopes are taken off the queue in arrival order. Each request
//! is dispatched on its own task so a slow tool call does not hold up the
//! rest of the queue. Replies carry the originating session id, so the
//! transport delivers them to that session only.

use std::sync::Arc;
use std::time::Duration;

use lantern_core::{Envelope, Inbound, Outbound, OutboundSink};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::context::{EngineDeps, RpcContext};
use crate::handlers;
use crate::registry::MethodRegistry;

/// The protocol engine.
#[derive(Clone)]
pub struct Engine {
    registry: Arc<MethodRegistry>,
    deps: Arc<EngineDeps>,
}

impl Engine {
    /// Engine over an explicit registry.
    pub fn new(registry: MethodRegistry, deps: EngineDeps) -> Self {
        Self {
            registry: Arc::new(registry),
            deps: Arc::new(deps),
        }
    }

    /// Engine with every built-in handler registered.
    pub fn with_default_handlers(deps: EngineDeps, handler_timeout: Duration) -> Self {
        let mut registry = MethodRegistry::with_timeout(handler_timeout);
        handlers::register_all(&mut registry);
        Self::new(registry, deps)
    }

    /// Process one inbound envelope; returns the reply, if one is owed.
    ///
    /// Notifications are dispatched for their side effects only. Inbound
    /// responses are not expected from clients and are dropped.
    pub async fn handle(&self, inbound: Inbound) -> Option<Envelope> {
        let Inbound { context, envelope } = inbound;
        match envelope {
            Envelope::Request(request) => {
                let is_notification = request.is_notification();
                let method = request.method.clone();
                let ctx = RpcContext {
                    deps: Arc::clone(&self.deps),
                    request: context,
                };
                let response = self.registry.dispatch(request, &ctx).await;
                if is_notification {
                    debug!(method, "notification handled");
                    None
                } else {
                    Some(response.into())
                }
            }
            Envelope::Response(response) => {
                debug!(id = ?response.id, "dropping inbound response");
                None
            }
        }
    }

    /// Run until the queue closes or `cancel` fires.
    pub async fn run(
        self,
        mut inbound_rx: mpsc::Receiver<Inbound>,
        sink: Arc<dyn OutboundSink>,
        cancel: CancellationToken,
    ) {
        info!(methods = ?self.registry.methods(), "protocol engine started");
        loop {
            let inbound = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                msg = inbound_rx.recv() => match msg {
                    Some(inbound) => inbound,
                    None => break,
                },
            };

            let engine = self.clone();
            let sink = Arc::clone(&sink);
            drop(tokio::spawn(async move {
                let session_id = inbound.context.session_id.clone();
                if let Some(reply) = engine.handle(inbound).await {
                    sink.emit(Outbound {
                        session_id,
                        envelope: reply,
                    });
                }
            }));
        }
        info!("protocol engine stopped");
    }
}

//! Shared boot helper for the end-to-end tests.

#![allow(dead_code)]

use std::time::Duration;

use lantern_rpc::{Engine, EngineDeps};
use lantern_server::{LanternServer, ServerHandle, TransportConfig};
use tokio::sync::mpsc;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Boot a server wired to the real engine on an ephemeral port.
pub async fn boot_server(config: TransportConfig) -> (String, LanternServer, ServerHandle) {
    let (inbound_tx, inbound_rx) = mpsc::channel(64);
    let server = LanternServer::new(config, inbound_tx);
    let engine = Engine::with_default_handlers(EngineDeps::new(None), TIMEOUT);
    server
        .shutdown()
        .track("engine", tokio::spawn(engine.run(inbound_rx, server.sink(), server.shutdown().token())));
    let handle = server.listen().await.unwrap();
    let addr = format!("127.0.0.1:{}", handle.port());
    (addr, server, handle)
}

//! # lantern-agent
//!
//! Lantern MCP server binary: loads settings, wires the knowledge client,
//! protocol engine, and transport together, and serves until ctrl-c or
//! end of input.

#![deny(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lantern_client::{GleanClient, KnowledgeClient};
use lantern_core::{init_subscriber, LogFormat};
use lantern_rpc::{Engine, EngineDeps};
use lantern_server::{run_stdio, stdio_sink, LanternServer, ShutdownCoordinator, TransportConfig};
use lantern_settings::LanternSettings;
use tokio::sync::mpsc;

/// How long shutdown waits for tasks to drain.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TransportKind {
    /// One client over stdin/stdout.
    Stdio,
    /// HTTP, event streams, and sockets on one port.
    Http,
}

/// Lantern MCP server.
#[derive(Parser, Debug)]
#[command(name = "lantern", version, about = "MCP server for enterprise knowledge search and chat")]
struct Cli {
    /// Transport to serve.
    #[arg(long, value_enum, default_value = "stdio")]
    transport: TransportKind,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Log filter when `RUST_LOG` is unset (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, settings: &mut LanternSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

fn knowledge_client(settings: &LanternSettings) -> Option<Arc<dyn KnowledgeClient>> {
    match GleanClient::from_settings(&settings.api) {
        Ok(client) => {
            tracing::info!(base_url = client.base_url(), "knowledge client configured");
            Some(Arc::new(client) as Arc<dyn KnowledgeClient>)
        }
        Err(e) => {
            tracing::warn!(error = %e, "knowledge client unavailable, tool calls will fail");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut settings = lantern_settings::load_settings().context("Failed to load settings")?;
    args.apply(&mut settings);
    init_subscriber(&settings.logging.level, LogFormat::from_name(&settings.logging.format));

    let mut deps = EngineDeps::new(knowledge_client(&settings));
    deps.server_name.clone_from(&settings.name);
    let engine = Engine::with_default_handlers(deps, settings.engine.handler_timeout());
    let (inbound_tx, inbound_rx) = mpsc::channel(settings.engine.inbound_queue_capacity);

    match args.transport {
        TransportKind::Stdio => serve_stdio(&settings, engine, inbound_tx, inbound_rx).await,
        TransportKind::Http => serve_http(&settings, engine, inbound_tx, inbound_rx).await,
    }
}

async fn serve_stdio(
    settings: &LanternSettings,
    engine: Engine,
    inbound_tx: mpsc::Sender<lantern_core::Inbound>,
    inbound_rx: mpsc::Receiver<lantern_core::Inbound>,
) -> Result<()> {
    let shutdown = ShutdownCoordinator::new();
    let (sink, outbound_rx) = stdio_sink(settings.server.push_channel_capacity);
    shutdown.track("engine", tokio::spawn(engine.run(inbound_rx, Arc::new(sink), shutdown.token())));

    let pump = run_stdio(
        tokio::io::stdin(),
        tokio::io::stdout(),
        inbound_tx,
        outbound_rx,
        settings.server.max_message_size,
        shutdown.token(),
    );
    tracing::info!("MCP server started with stdio transport");

    // The pump returns once stdin is closed and every pending reply is written.
    tokio::select! {
        result = pump => result.context("stdio transport failed")?,
        signal = tokio::signal::ctrl_c() => signal.context("Failed to listen for ctrl-c")?,
    }

    tracing::info!(tasks = shutdown.tracked(), "Shutting down...");
    let _ = shutdown.graceful_shutdown(SHUTDOWN_TIMEOUT).await;
    Ok(())
}

async fn serve_http(
    settings: &LanternSettings,
    engine: Engine,
    inbound_tx: mpsc::Sender<lantern_core::Inbound>,
    inbound_rx: mpsc::Receiver<lantern_core::Inbound>,
) -> Result<()> {
    let mut server = LanternServer::new(TransportConfig::from(&settings.server), inbound_tx);
    match lantern_server::metrics::install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(e) => tracing::warn!(error = %e, "metrics recorder unavailable, /metrics disabled"),
    }
    server
        .shutdown()
        .track("engine", tokio::spawn(engine.run(inbound_rx, server.sink(), server.shutdown().token())));

    let handle = server.listen().await.context("Failed to bind server")?;
    tracing::info!(
        "MCP server listening on http://{} (session timeout {:?})",
        handle.addr,
        server.config().session_timeout()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!(tasks = server.shutdown().tracked(), "Shutting down...");
    let aborted = server.shutdown().graceful_shutdown(SHUTDOWN_TIMEOUT).await;

    tracing::info!(aborted, "Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_to_stdio() {
        let cli = Cli::parse_from(["lantern"]);
        assert_eq!(cli.transport, TransportKind::Stdio);
        assert!(cli.port.is_none());
    }

    #[test]
    fn cli_http_with_port() {
        let cli = Cli::parse_from(["lantern", "--transport", "http", "--port", "8080"]);
        assert_eq!(cli.transport, TransportKind::Http);
        assert_eq!(cli.port, Some(8080));
    }

    #[test]
    fn cli_rejects_unknown_transport() {
        assert!(Cli::try_parse_from(["lantern", "--transport", "carrier-pigeon"]).is_err());
    }

    #[test]
    fn cli_overrides_settings() {
        let cli = Cli::parse_from(["lantern", "--host", "0.0.0.0", "--port", "9000", "--log-level", "debug"]);
        let mut settings = LanternSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn cli_without_flags_keeps_settings() {
        let cli = Cli::parse_from(["lantern"]);
        let mut settings = LanternSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn missing_credentials_leave_client_unconfigured() {
        let settings = LanternSettings::default();
        assert!(knowledge_client(&settings).is_none());
    }
}

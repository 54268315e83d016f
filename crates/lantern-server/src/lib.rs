//! # lantern-server
//!
//! Session-aware transports for the Lantern MCP server.
//!
//! - **Session registry**: live sessions, activity timestamps, identity
//!   overrides, and per-session push listeners
//! - **Gateway**: `POST`/`GET`/`DELETE /transport` plus `GET /health`
//! - **Event streams** and **sockets**: server-push delivery per session
//! - **Reaper**: periodic idle-session eviction
//! - **Facade**: [`Transport`], the only surface the protocol engine sees
//! - **Stdio**: the sessionless single-client pipe

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod facade;
pub mod health;
pub mod http;
pub mod metrics;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod stdio;
pub mod websocket;

pub use config::TransportConfig;
pub use errors::TransportError;
pub use facade::Transport;
pub use server::{LanternServer, ServerHandle};
pub use session::{SessionRegistry, SessionSnapshot};
pub use shutdown::ShutdownCoordinator;
pub use stdio::{run_stdio, stdio_sink, StdioSink};

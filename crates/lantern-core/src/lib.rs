//! # lantern-core
//!
//! Shared building blocks for the Lantern MCP server:
//!
//! - JSON-RPC 2.0 envelope types and the inbound codec/validator
//! - Error codes shared by the transport and the protocol engine
//! - Opaque session identifiers
//! - The seam between transports and the protocol engine
//!   ([`Inbound`], [`Outbound`], [`OutboundSink`])
//! - `tracing` subscriber initialisation

#![deny(unsafe_code)]

pub mod codec;
pub mod envelope;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod transport;

pub use codec::{decode, decode_str, encode, ParseFailure};
pub use envelope::{Envelope, ErrorObject, Outcome, Request, RequestId, Response};
pub use ids::SessionId;
pub use logging::{init_subscriber, LogFormat};
pub use transport::{ChannelKind, Inbound, Outbound, OutboundSink, RequestContext};

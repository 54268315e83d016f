//! # lantern-rpc
//!
//! The protocol engine. Transports hand it decoded envelopes through an
//! `mpsc` queue; it dispatches requests to registered [`MethodHandler`]s and
//! pushes replies back through an [`lantern_core::OutboundSink`].

#![deny(unsafe_code)]

pub mod context;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod registry;

pub use context::{EngineDeps, RpcContext};
pub use engine::Engine;
pub use errors::RpcError;
pub use registry::{MethodHandler, MethodRegistry, DEFAULT_HANDLER_TIMEOUT};

//! # lantern-client
//!
//! Outbound client for the enterprise knowledge index: search and chat calls,
//! HTTP error classification, and plain-text rendering of results.

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod format;

pub use client::{GleanClient, KnowledgeClient, ACT_AS_HEADER};
pub use errors::{GleanError, Result};
pub use format::{format_chat, format_search};

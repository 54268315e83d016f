//! Session tracking and idle eviction.

pub mod reaper;
pub mod registry;

pub use reaper::spawn_reaper;
pub use registry::{ListenerId, Payload, SessionRegistry, SessionSnapshot};

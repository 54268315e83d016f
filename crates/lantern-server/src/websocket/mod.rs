//! Duplex socket channel.

pub mod socket;

pub use socket::{announcement, run_socket_session, upgrade, SESSION_ANNOUNCEMENT};

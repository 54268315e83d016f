//! Transport errors.

/// Failure inside a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Could not bind the listen address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Stdio pipe or socket I/O failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The engine's inbound queue is closed.
    #[error("protocol engine is not accepting requests")]
    EngineClosed,
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TransportError>;

//! Broadcast server errors.
//!
//! Only startup can fail the server as a whole; a network fault in a
//! pump terminates that one connection and is logged, never propagated.

use thiserror::Error;

/// Result type for broadcast operations
pub type BroadcastResult<T> = Result<T, BroadcastError>;

#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The configured bind address does not parse
    #[error("invalid broadcast bind address '{addr}': {reason}")]
    InvalidAddr { addr: String, reason: String },

    /// The listener socket could not be bound
    #[error("failed to bind broadcast listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

//! Error types for the bridge.

use std::io;
use thiserror::Error;

/// Errors surfaced through the public API.
///
/// Only registration-time problems reach the caller; everything that goes
/// wrong inside the worker threads after a socket is live (a send that
/// would block, a failed socket command, a full application channel) is
/// logged and survived rather than raised.
#[derive(Error, Debug)]
pub enum DriveshaftError {
    /// Invalid combination of registration arguments.
    #[error("usage error: {0}")]
    Usage(String),

    /// A socket-type name outside the accepted vocabulary.
    #[error("unknown socket type: {0:?}")]
    UnknownSocketType(String),

    /// Error reported by the messaging library.
    #[error("zmq error: {0}")]
    Zmq(#[from] zmq::Error),

    /// A worker thread could not be spawned.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The bridge has already been torn down.
    #[error("bridge context has shut down")]
    Terminated,
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, DriveshaftError>;

impl DriveshaftError {
    /// Create a usage error with a message.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }
}

//! Error taxonomy for the debug session engine.

use dap_protocol::ProtocolError;
use dap_transport::TransportError;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while driving a debug session.
///
/// `Connection` and `Protocol` are fatal to the session that raised them;
/// `Timeout` and `Dap` are per-operation and leave session state unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure: process spawn, TCP connect, or a stream
    /// that died mid-conversation. The session should be disconnected.
    #[error("connection error: {0}")]
    Connection(String),

    /// Framing or JSON integrity violation. The stream is no longer
    /// trustworthy; the receive task exits and pending waiters are
    /// cancelled.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A budgeted wait elapsed. Carries what was being awaited. The session
    /// is intact and the caller may retry.
    #[error("timeout waiting for {0}")]
    Timeout(String),

    /// The adapter answered `success: false`. Carries the adapter-provided
    /// message.
    #[error("DAP request '{command}' failed: {message}")]
    Dap {
        /// The command that failed.
        command: String,
        /// The adapter's error message.
        message: String,
    },

    /// No session registered under the given ID.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// A session with this ID exists, or the ID belonged to a session that
    /// was closed (IDs are never reused).
    #[error("session already exists: {0}")]
    SessionAlreadyExists(String),

    /// The adapter name matched neither a registered adapter nor an alias.
    #[error("unknown adapter: {name} (available: {available:?})")]
    AdapterNotFound {
        /// The name that failed to resolve.
        name: String,
        /// Registered adapter names.
        available: Vec<String>,
    },

    /// Caller misuse: a missing required argument or an operation issued
    /// out of sequence (e.g. finishing a launch that was never begun).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An adapter could not produce a transport or argument set from the
    /// options it was given.
    #[error("adapter configuration error: {0}")]
    Adapter(String),
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connection(message) => Error::Connection(message),
            TransportError::Protocol(protocol) => Error::Protocol(protocol),
        }
    }
}

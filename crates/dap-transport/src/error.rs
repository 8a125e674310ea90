//! Transport-level error type.

use dap_protocol::ProtocolError;
use thiserror::Error;

/// Failure while moving bytes to or from a debug adapter.
///
/// `Connection` covers OS-level failures (spawn, TCP connect, broken pipe);
/// `Protocol` covers framing and JSON integrity violations. Both are fatal
/// to the stream they occur on.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Process spawn failure, TCP connect failure, or an I/O error on an
    /// established stream.
    #[error("connection error: {0}")]
    Connection(String),

    /// The stream delivered bytes that do not form a valid DAP frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

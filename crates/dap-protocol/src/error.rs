//! Protocol-level error type.

use thiserror::Error;

/// Framing or JSON integrity violation.
///
/// Any of these means the byte stream can no longer be trusted; the session
/// layer treats them the same way as a lost connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The header section was not valid UTF-8.
    #[error("invalid header encoding")]
    InvalidHeaderEncoding,

    /// A `Content-Length` header was present but its value did not parse as
    /// a non-negative integer.
    #[error("invalid Content-Length value: {0}")]
    InvalidContentLength(String),

    /// The header section contained no `Content-Length` line.
    #[error("missing Content-Length header")]
    MissingContentLength,

    /// The message body was not valid JSON.
    #[error("invalid JSON in DAP message: {0}")]
    InvalidJson(String),

    /// The message body decoded to something other than a JSON object.
    #[error("DAP message must be an object, got {0}")]
    NotAnObject(&'static str),

    /// The message carried a known `type` tag but did not match that
    /// message's required shape.
    #[error("invalid DAP {kind} message: {reason}")]
    InvalidMessage {
        /// The `type` tag of the offending message.
        kind: &'static str,
        /// Decoder diagnostic.
        reason: String,
    },

    /// A message failed to serialize.
    #[error("failed to serialize DAP message: {0}")]
    Serialize(String),

    /// The peer closed the stream in the middle of a frame.
    #[error("connection closed while reading {0}")]
    UnexpectedEof(&'static str),
}

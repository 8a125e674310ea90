//! DAP message envelopes.
//!
//! DAP has three message kinds, all sharing a monotonically increasing
//! per-direction `seq`:
//! - Request: client → adapter (`command`, `arguments`)
//! - Response: adapter → client, correlated by `request_seq`
//! - Event: adapter → client, uncorrelated (`event`, `body`)
//!
//! Field spelling follows the DAP schema itself rather than a blanket case
//! convention: `request_seq` really is snake case on the wire.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// A DAP request message from client to adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DapRequest {
    /// Sequence number (incremented for each outbound message).
    pub seq: i64,
    /// Message type (always "request").
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Command name (e.g. "initialize", "setBreakpoints").
    pub command: String,
    /// Command-specific arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl DapRequest {
    /// Build a request envelope for `command`.
    pub fn new(seq: i64, command: impl Into<String>, arguments: Option<Value>) -> Self {
        Self { seq, msg_type: "request".to_string(), command: command.into(), arguments }
    }
}

/// A DAP response message from adapter to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DapResponse {
    /// Sequence number.
    pub seq: i64,
    /// Message type (always "response").
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Sequence number of the request this responds to.
    pub request_seq: i64,
    /// Whether the request succeeded.
    pub success: bool,
    /// Command name echoed back from the request.
    pub command: String,
    /// Error message when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Command-specific response body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl DapResponse {
    /// Decode the response body into a typed body struct.
    ///
    /// A missing body decodes as an empty object, so body types with
    /// defaulted fields tolerate adapters that omit it entirely.
    pub fn parse_body<T>(&self) -> Result<T, crate::ProtocolError>
    where
        T: serde::de::DeserializeOwned,
    {
        let body = self.body.clone().unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        serde_json::from_value(body).map_err(|e| crate::ProtocolError::InvalidMessage {
            kind: "response",
            reason: format!("body for '{}': {e}", self.command),
        })
    }
}

/// A DAP event message from adapter to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DapEvent {
    /// Sequence number.
    pub seq: i64,
    /// Message type (always "event").
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Event name (e.g. "initialized", "stopped").
    pub event: String,
    /// Event-specific body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl DapEvent {
    /// Build an event envelope named `event`.
    pub fn new(seq: i64, event: impl Into<String>, body: Option<Value>) -> Self {
        Self { seq, msg_type: "event".to_string(), event: event.into(), body }
    }
}

/// A decoded DAP message, dispatched on its `type` tag.
///
/// The `Other` variant carries messages whose tag is outside the core
/// request/response/event vocabulary; receivers ignore those rather than
/// treating them as stream corruption.
#[derive(Debug, Clone, PartialEq)]
pub enum DapMessage {
    /// A request envelope.
    Request(DapRequest),
    /// A response envelope.
    Response(DapResponse),
    /// An event envelope.
    Event(DapEvent),
    /// A message with an unrecognized or missing `type` tag.
    Other(Value),
}

impl Serialize for DapMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Each envelope already carries its own `type` field.
        match self {
            DapMessage::Request(r) => r.serialize(serializer),
            DapMessage::Response(r) => r.serialize(serializer),
            DapMessage::Event(e) => e.serialize(serializer),
            DapMessage::Other(v) => v.serialize(serializer),
        }
    }
}

impl From<DapRequest> for DapMessage {
    fn from(request: DapRequest) -> Self {
        DapMessage::Request(request)
    }
}

impl From<DapResponse> for DapMessage {
    fn from(response: DapResponse) -> Self {
        DapMessage::Response(response)
    }
}

impl From<DapEvent> for DapMessage {
    fn from(event: DapEvent) -> Self {
        DapMessage::Event(event)
    }
}

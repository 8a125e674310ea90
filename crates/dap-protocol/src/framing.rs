//! Content-Length framing codec.
//!
//! Encode writes one `Content-Length` header, a blank line, and a compact
//! JSON body. Decode is split into the two halves the transports need:
//! header scanning ([`parse_content_length`]) and body decoding
//! ([`decode_message`]). The byte-buffer discipline between the two (keep
//! everything read past the `\r\n\r\n` separator) lives with the
//! transports, which own the streams.

use crate::error::ProtocolError;
use crate::messages::{DapEvent, DapMessage, DapRequest, DapResponse};
use serde_json::Value;

/// Separator between the header section and the JSON body.
pub const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";

const CONTENT_LENGTH: &str = "content-length";

/// Encode a DAP message with a Content-Length header.
///
/// The body is compact JSON (no whitespace between tokens), so the declared
/// length is exactly the UTF-8 byte length of the serialized message.
pub fn encode_message(message: &DapMessage) -> Result<Vec<u8>, ProtocolError> {
    let content =
        serde_json::to_vec(message).map_err(|e| ProtocolError::Serialize(e.to_string()))?;
    let mut data = format!("Content-Length: {}\r\n\r\n", content.len()).into_bytes();
    data.extend_from_slice(&content);
    Ok(data)
}

/// Parse `Content-Length` out of a header section.
///
/// `header_data` is the header bytes without the trailing `\r\n\r\n`. The
/// header name is matched case-insensitively; the value must be a
/// non-negative integer.
pub fn parse_content_length(header_data: &[u8]) -> Result<usize, ProtocolError> {
    let header =
        std::str::from_utf8(header_data).map_err(|_| ProtocolError::InvalidHeaderEncoding)?;

    for line in header.split("\r\n") {
        // Split on the colon rather than slicing a fixed byte range: a
        // multi-byte header name must not land mid-char.
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.eq_ignore_ascii_case(CONTENT_LENGTH) {
            return value
                .trim()
                .parse::<usize>()
                .map_err(|_| ProtocolError::InvalidContentLength(line.to_string()));
        }
    }

    Err(ProtocolError::MissingContentLength)
}

/// Decode a DAP message body.
///
/// The content must be a JSON object. Messages tagged `request`, `response`
/// or `event` decode into their envelope; an unrecognized (or absent) tag
/// yields [`DapMessage::Other`], which receivers ignore.
pub fn decode_message(content: &[u8]) -> Result<DapMessage, ProtocolError> {
    let value: Value = serde_json::from_slice(content)
        .map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;

    if !value.is_object() {
        return Err(ProtocolError::NotAnObject(json_kind(&value)));
    }

    let tag = value.get("type").and_then(Value::as_str).map(str::to_string);
    match tag.as_deref() {
        Some("request") => serde_json::from_value::<DapRequest>(value)
            .map(DapMessage::Request)
            .map_err(|e| ProtocolError::InvalidMessage { kind: "request", reason: e.to_string() }),
        Some("response") => serde_json::from_value::<DapResponse>(value)
            .map(DapMessage::Response)
            .map_err(|e| ProtocolError::InvalidMessage { kind: "response", reason: e.to_string() }),
        Some("event") => serde_json::from_value::<DapEvent>(value)
            .map(DapMessage::Event)
            .map_err(|e| ProtocolError::InvalidMessage { kind: "event", reason: e.to_string() }),
        _ => Ok(DapMessage::Other(value)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

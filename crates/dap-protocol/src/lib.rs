//! Debug Adapter Protocol wire types for the DAP bridge.
//!
//! This crate defines the three DAP message envelopes (request, response,
//! event), typed argument and body structs for the command vocabulary the
//! bridge speaks, and the Content-Length framing codec used by every
//! transport.
//!
//! # Message Framing
//!
//! DAP frames messages with HTTP-style headers:
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <JSON message>
//! ```
//!
//! [`encode_message`] produces exactly this shape with a compact JSON body;
//! [`parse_content_length`] and [`decode_message`] are the two decode halves
//! that transports combine with their persistent read buffer.
//!
//! # Example
//!
//! ```
//! use dap_protocol::{encode_message, decode_message, DapMessage, DapRequest};
//!
//! let message = DapMessage::Request(DapRequest::new(1, "threads", None));
//! let bytes = encode_message(&message).unwrap();
//!
//! // Strip the header and decode the body back
//! let body_start = bytes.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
//! let decoded = decode_message(&bytes[body_start..]).unwrap();
//! assert_eq!(decoded, message);
//! ```
//!
//! # References
//!
//! - [Debug Adapter Protocol Specification](https://microsoft.github.io/debug-adapter-protocol/)

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod framing;
mod messages;
mod types;

pub use error::ProtocolError;
pub use framing::{HEADER_SEPARATOR, decode_message, encode_message, parse_content_length};
pub use messages::{DapEvent, DapMessage, DapRequest, DapResponse};
pub use types::{
    Breakpoint, ContinueArguments, ContinueResponseBody, DisconnectArguments, EvaluateArguments,
    EvaluateResponseBody, InitializeRequestArguments, NextArguments, PauseArguments, Scope,
    ScopesArguments, ScopesResponseBody, SetBreakpointsArguments, SetBreakpointsResponseBody,
    SetExceptionBreakpointsArguments, Source, SourceBreakpoint, StackFrame, StackTraceArguments,
    StackTraceResponseBody, StepInArguments, StepOutArguments, Thread, ThreadsResponseBody,
    Variable, VariablesArguments, VariablesResponseBody,
};

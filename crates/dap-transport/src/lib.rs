//! Byte-stream carriers for DAP traffic.
//!
//! A [`Transport`] moves framed DAP messages between the bridge and a debug
//! adapter. Three carriers are provided, differing only in how
//! `connect`/`disconnect` acquire and release the byte streams:
//!
//! - [`StdioTransport`] spawns the adapter and frames messages over its
//!   stdin/stdout pipes.
//! - [`SocketTransport`] connects to an adapter already listening on TCP.
//! - [`SubprocessSocketTransport`] spawns an adapter that itself listens on
//!   a TCP port (js-debug style), waits for the port to accept, then runs a
//!   socket transport against it.
//!
//! All three share [`FrameReader`], the persistent decode buffer: a single
//! read from the stream may return bytes past the current frame's header or
//! body, and those bytes must be retained for the next frame.
//!
//! # Ownership
//!
//! A transport exclusively owns whatever it spawned. `disconnect` tears the
//! connection down and terminates the child process (SIGTERM, a 2 second
//! grace window, then SIGKILL); there is no path in which the transport is
//! gone while its child survives.
//!
//! # Example
//!
//! ```no_run
//! use dap_transport::{SocketTransport, Transport};
//!
//! # async fn run() -> Result<(), dap_transport::TransportError> {
//! let transport = SocketTransport::new("127.0.0.1".to_string(), 5678);
//! transport.connect().await?;
//! let message = transport.receive().await?;
//! transport.disconnect().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod frame;
mod process;
mod socket;
mod stdio;
mod subprocess_socket;

pub use error::TransportError;
pub use frame::{FrameReader, write_message};
pub use socket::SocketTransport;
pub use stdio::StdioTransport;
pub use subprocess_socket::SubprocessSocketTransport;

use async_trait::async_trait;
use dap_protocol::DapMessage;

/// A byte-stream carrier underneath DAP framing.
///
/// Methods take `&self`: implementations guard their read and write halves
/// independently so a blocked `receive` never prevents a concurrent `send`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the connection to the debug adapter.
    ///
    /// Connecting an already-connected transport is a no-op.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Close the connection and release everything the transport owns.
    ///
    /// Idempotent; failures during teardown are logged, not surfaced.
    async fn disconnect(&self);

    /// Send one framed message to the adapter.
    async fn send(&self, message: &DapMessage) -> Result<(), TransportError>;

    /// Receive the next framed message from the adapter.
    async fn receive(&self) -> Result<DapMessage, TransportError>;

    /// Whether the transport currently holds a live connection.
    fn is_connected(&self) -> bool;
}

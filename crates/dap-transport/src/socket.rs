//! Transport that connects to an adapter already listening on TCP.

use crate::error::TransportError;
use crate::frame::{FrameReader, write_message};
use crate::Transport;
use async_trait::async_trait;
use dap_protocol::DapMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

/// Transport that talks DAP over an established TCP connection.
pub struct SocketTransport {
    host: String,
    port: u16,
    writer: Mutex<Option<OwnedWriteHalf>>,
    reader: Mutex<Option<(OwnedReadHalf, FrameReader)>>,
    connected: AtomicBool,
}

impl SocketTransport {
    /// Create a socket transport targeting `host:port`.
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await.map_err(|e| {
            TransportError::Connection(format!(
                "failed to connect to {}:{}: {e}",
                self.host, self.port
            ))
        })?;
        tracing::debug!(host = %self.host, port = self.port, "connected to adapter socket");

        let (read_half, write_half) = stream.into_split();
        *self.reader.lock().await = Some((read_half, FrameReader::new()));
        *self.writer.lock().await = Some(write_half);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut write_half) = self.writer.lock().await.take() {
            let _ = write_half.shutdown().await;
        }
        *self.reader.lock().await = None;
    }

    async fn send(&self, message: &DapMessage) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        let Some(write_half) = writer.as_mut() else {
            return Err(TransportError::Connection("transport not connected".to_string()));
        };
        write_message(write_half, message).await
    }

    async fn receive(&self) -> Result<DapMessage, TransportError> {
        let mut reader = self.reader.lock().await;
        let Some((read_half, frames)) = reader.as_mut() else {
            return Err(TransportError::Connection("transport not connected".to_string()));
        };
        frames.read_message(read_half).await
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

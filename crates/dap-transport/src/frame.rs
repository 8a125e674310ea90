//! Frame assembly over async byte streams.
//!
//! [`FrameReader`] owns the persistent decode buffer. A single read from the
//! underlying stream may return more than one header, a header plus part of
//! a body, or several complete frames; every byte read past the current
//! position is retained for the next call. Losing those bytes is the classic
//! rewrite mistake, so the buffer is an explicit field rather than a local.

use crate::error::TransportError;
use dap_protocol::{
    DapMessage, HEADER_SEPARATOR, ProtocolError, decode_message, encode_message,
    parse_content_length,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const READ_CHUNK: usize = 4096;

/// Incremental DAP frame decoder with a persistent carry-over buffer.
#[derive(Debug, Default)]
pub struct FrameReader {
    buffer: Vec<u8>,
}

impl FrameReader {
    /// Create a reader with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and decode the next DAP message from `reader`.
    pub async fn read_message<R>(&mut self, reader: &mut R) -> Result<DapMessage, TransportError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let header = self.read_until_separator(reader).await?;
        let content_length = parse_content_length(&header)?;
        let content = self.read_exactly(reader, content_length).await?;
        Ok(decode_message(&content)?)
    }

    /// Append one chunk from the stream to the buffer.
    async fn fill<R>(&mut self, reader: &mut R, context: &'static str) -> Result<(), TransportError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut chunk = [0u8; READ_CHUNK];
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|e| TransportError::Connection(format!("read failed: {e}")))?;
        if n == 0 {
            return Err(ProtocolError::UnexpectedEof(context).into());
        }
        self.buffer.extend_from_slice(&chunk[..n]);
        Ok(())
    }

    /// Read until `\r\n\r\n` appears; return the bytes before it.
    ///
    /// Everything after the separator stays in the buffer for the body read.
    async fn read_until_separator<R>(&mut self, reader: &mut R) -> Result<Vec<u8>, TransportError>
    where
        R: AsyncRead + Unpin + Send,
    {
        loop {
            if let Some(at) = find_separator(&self.buffer) {
                let mut header: Vec<u8> =
                    self.buffer.drain(..at + HEADER_SEPARATOR.len()).collect();
                header.truncate(at);
                return Ok(header);
            }
            self.fill(reader, "header").await?;
        }
    }

    /// Pull exactly `n` bytes from the buffer plus the stream.
    async fn read_exactly<R>(&mut self, reader: &mut R, n: usize) -> Result<Vec<u8>, TransportError>
    where
        R: AsyncRead + Unpin + Send,
    {
        while self.buffer.len() < n {
            self.fill(reader, "content").await?;
        }
        Ok(self.buffer.drain(..n).collect())
    }
}

fn find_separator(buffer: &[u8]) -> Option<usize> {
    buffer.windows(HEADER_SEPARATOR.len()).position(|window| window == HEADER_SEPARATOR)
}

/// Encode `message` and write the complete frame to `writer`.
pub async fn write_message<W>(writer: &mut W, message: &DapMessage) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin + Send,
{
    let data = encode_message(message)?;
    writer
        .write_all(&data)
        .await
        .map_err(|e| TransportError::Connection(format!("write failed: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| TransportError::Connection(format!("flush failed: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dap_protocol::{DapEvent, DapRequest};
    use serde_json::json;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// AsyncRead double that returns exactly one scripted chunk per poll,
    /// then EOF. Lets tests pin down recv boundaries precisely.
    struct ChunkedReader {
        chunks: std::collections::VecDeque<Vec<u8>>,
    }

    impl ChunkedReader {
        fn new(chunks: Vec<Vec<u8>>) -> Self {
            Self { chunks: chunks.into() }
        }
    }

    impl AsyncRead for ChunkedReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if let Some(chunk) = self.chunks.pop_front() {
                buf.put_slice(&chunk);
            }
            Poll::Ready(Ok(()))
        }
    }

    fn sample_messages() -> (DapMessage, DapMessage) {
        let first = DapMessage::Request(DapRequest::new(
            1,
            "setBreakpoints",
            Some(json!({"source": {"path": "/tmp/échantillon.py"}, "breakpoints": [{"line": 10}]})),
        ));
        let second = DapMessage::Event(DapEvent::new(
            2,
            "output",
            Some(json!({"category": "stdout", "output": "四十二\n"})),
        ));
        (first, second)
    }

    #[tokio::test]
    async fn straddled_reads_lose_no_bytes() {
        // Two encoded frames split at every possible offset into two recvs:
        // the reader must hand back exactly M1 then M2 each time.
        let (first, second) = sample_messages();
        let mut wire = encode_message(&first).unwrap();
        wire.extend_from_slice(&encode_message(&second).unwrap());

        for split in 1..wire.len() {
            let chunks = vec![wire[..split].to_vec(), wire[split..].to_vec()];
            let mut reader = ChunkedReader::new(chunks);
            let mut frames = FrameReader::new();

            let got_first = frames.read_message(&mut reader).await.unwrap();
            let got_second = frames.read_message(&mut reader).await.unwrap();
            assert_eq!(got_first, first, "split at {split}");
            assert_eq!(got_second, second, "split at {split}");
        }
    }

    #[tokio::test]
    async fn one_recv_may_carry_many_frames() {
        let (first, second) = sample_messages();
        let mut wire = encode_message(&first).unwrap();
        wire.extend_from_slice(&encode_message(&second).unwrap());

        let mut reader = ChunkedReader::new(vec![wire]);
        let mut frames = FrameReader::new();
        assert_eq!(frames.read_message(&mut reader).await.unwrap(), first);
        // The second frame is served entirely from the carry-over buffer.
        assert_eq!(frames.read_message(&mut reader).await.unwrap(), second);
    }

    #[tokio::test]
    async fn eof_mid_header_is_protocol_error() {
        let mut reader = ChunkedReader::new(vec![b"Content-Len".to_vec()]);
        let mut frames = FrameReader::new();
        let err = frames.read_message(&mut reader).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Protocol(ProtocolError::UnexpectedEof("header"))
        ));
    }

    #[tokio::test]
    async fn eof_mid_body_is_protocol_error() {
        let mut reader =
            ChunkedReader::new(vec![b"Content-Length: 50\r\n\r\n{\"seq\":1".to_vec()]);
        let mut frames = FrameReader::new();
        let err = frames.read_message(&mut reader).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Protocol(ProtocolError::UnexpectedEof("content"))
        ));
    }

    #[tokio::test]
    async fn write_message_emits_full_frame() {
        let (first, _) = sample_messages();
        let mut sink = std::io::Cursor::new(Vec::new());
        write_message(&mut sink, &first).await.unwrap();
        assert_eq!(sink.into_inner(), encode_message(&first).unwrap());
    }
}

//! Raw TCP transport with `\0`-terminated frames.
//!
//! The legacy client speaks over a plain socket: every XML or XT message is
//! followed by a single NUL byte. TCP gives us a byte stream, not messages,
//! so the read half keeps a buffer and hands out one frame at a time.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::{
    next_connection_id, Connection, ConnectionId, Transport, TransportError,
    DEFAULT_MAX_FRAME_LEN, FRAME_TERMINATOR,
};

const READ_CHUNK: usize = 4096;

/// A TCP [`Transport`] that listens for incoming game clients.
pub struct TcpTransport {
    listener: TcpListener,
    max_frame_len: usize,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self {
            listener,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        })
    }

    /// Sets the largest frame a peer may send before the connection is
    /// treated as broken.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        let _ = stream.set_nodelay(true);

        let id = next_connection_id();
        tracing::debug!(%id, %addr, "accepted TCP connection");

        let (read, write) = stream.into_split();
        Ok(TcpConnection {
            id,
            reader: Mutex::new(FrameReader::new(read, self.max_frame_len)),
            writer: Mutex::new(write),
        })
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }
}

/// Splits a byte stream into `\0`-terminated frames.
struct FrameReader {
    read: OwnedReadHalf,
    buf: Vec<u8>,
    max_frame_len: usize,
}

impl FrameReader {
    fn new(read: OwnedReadHalf, max_frame_len: usize) -> Self {
        Self {
            read,
            buf: Vec::with_capacity(READ_CHUNK),
            max_frame_len,
        }
    }

    /// Pops the next complete frame out of the buffer, if one is there.
    /// Empty frames (stray terminators) are skipped.
    fn take_frame(&mut self) -> Option<Vec<u8>> {
        while let Some(end) =
            self.buf.iter().position(|b| *b == FRAME_TERMINATOR)
        {
            let mut frame: Vec<u8> = self.buf.drain(..=end).collect();
            frame.pop();
            if !frame.is_empty() {
                return Some(frame);
            }
        }
        None
    }

    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            if let Some(frame) = self.take_frame() {
                return Ok(Some(frame));
            }
            if self.buf.len() > self.max_frame_len {
                return Err(TransportError::FrameTooLong {
                    limit: self.max_frame_len,
                });
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self
                .read
                .read(&mut chunk)
                .await
                .map_err(TransportError::ReceiveFailed)?;
            if n == 0 {
                // Unterminated trailing bytes are not a frame.
                if !self.buf.is_empty() {
                    tracing::trace!(
                        bytes = self.buf.len(),
                        "discarding partial frame at EOF"
                    );
                }
                return Ok(None);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

/// A single TCP connection. Reads and writes use separate halves so the
/// writer task never waits on a pending read.
pub struct TcpConnection {
    id: ConnectionId,
    reader: Mutex<FrameReader>,
    writer: Mutex<OwnedWriteHalf>,
}

impl Connection for TcpConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        self.reader.lock().await.next_frame().await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

//! WebSocket listener for browser-hosted clients.
//!
//! One WebSocket message carries one frame. Clients that pad messages with
//! a trailing `\0` are accepted, so frames reaching the codec look the same
//! as on the TCP listener. Outbound frames go out as text messages.

use std::io;
use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{
    next_connection_id, strip_terminator, Connection, ConnectionId, Transport, TransportError,
    DEFAULT_MAX_FRAME_LEN,
};

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// Wraps a tungstenite failure as the I/O error the transport errors carry.
fn io_error(kind: io::ErrorKind, e: tungstenite::Error) -> io::Error {
    io::Error::new(kind, e)
}

/// Listens for WebSocket upgrades.
pub struct WebSocketTransport {
    listener: TcpListener,
    max_frame_len: usize,
}

impl WebSocketTransport {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket listener bound");
        Ok(Self {
            listener,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        })
    }

    /// Largest frame a peer may send in one message.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        // A failed upgrade only loses this peer.
        let ws = tokio_tungstenite::accept_async(stream).await.map_err(|e| {
            tracing::debug!(%peer, error = %e, "WebSocket upgrade failed");
            TransportError::AcceptFailed(io_error(io::ErrorKind::ConnectionRefused, e))
        })?;

        let id = next_connection_id();
        tracing::debug!(conn_id = %id, %peer, "WebSocket client connected");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            max_frame_len: self.max_frame_len,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }
}

/// One upgraded client.
pub struct WebSocketConnection {
    id: ConnectionId,
    max_frame_len: usize,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    /// The frame inside one inbound message, or `None` for a message to
    /// skip (control frames, empty text).
    fn frame_of(&self, message: Message) -> Result<Option<Vec<u8>>, TransportError> {
        let payload: Vec<u8> = match message {
            Message::Text(text) => text.as_bytes().to_vec(),
            Message::Binary(data) => data.into(),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) | Message::Close(_) => {
                return Ok(None);
            }
        };
        let frame = strip_terminator(&payload);
        if frame.len() > self.max_frame_len {
            return Err(TransportError::FrameTooLong {
                limit: self.max_frame_len,
            });
        }
        Ok((!frame.is_empty()).then(|| frame.to_vec()))
    }
}

impl Connection for WebSocketConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let text = String::from_utf8_lossy(data).into_owned();
        self.sink
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::SendFailed(io_error(io::ErrorKind::BrokenPipe, e)))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut stream = self.stream.lock().await;
        while let Some(message) = stream.next().await {
            let message = message.map_err(|e| {
                TransportError::ReceiveFailed(io_error(io::ErrorKind::ConnectionReset, e))
            })?;
            if message.is_close() {
                break;
            }
            if let Some(frame) = self.frame_of(message)? {
                return Ok(Some(frame));
            }
        }
        tracing::trace!(conn_id = %self.id, "WebSocket stream ended");
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(io_error(io::ErrorKind::BrokenPipe, e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

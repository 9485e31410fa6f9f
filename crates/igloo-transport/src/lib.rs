//! Transport abstraction layer for Igloo.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the two socket flavors legacy clients use: raw TCP with `\0`-terminated
//! frames, and WebSocket text frames (browser/Flash-emulator clients).
//!
//! Both transports hand the layers above one complete frame per
//! [`Connection::recv`] call, with the terminator already stripped. Sending
//! is the mirror image: callers pass the frame body and the caller-side
//! writer appends [`FRAME_TERMINATOR`].
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

mod error;
mod tcp;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use tcp::{TcpConnection, TcpTransport};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Byte that terminates every frame on the wire.
pub const FRAME_TERMINATOR: u8 = 0;

/// Default upper bound for a single inbound frame.
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024;

/// Counter for generating unique connection IDs across all transports.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_connection_id() -> ConnectionId {
    ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
}

/// Returns the part of `data` before the first [`FRAME_TERMINATOR`].
///
/// Clients pad some frames with a trailing `\0` even on message-oriented
/// transports; anything after the first terminator is ignored.
pub fn strip_terminator(data: &[u8]) -> &[u8] {
    match data.iter().position(|b| *b == FRAME_TERMINATOR) {
        Some(end) => &data[..end],
        None => data,
    }
}

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
///
/// The futures are `Send` so that an accept loop generic over the
/// transport can run inside `tokio::spawn`.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Waits for and accepts the next incoming connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, TransportError>;
}

/// A single connection that can send and receive frames.
///
/// `send` and `recv` may be called concurrently from different tasks:
/// implementations keep the read and write halves behind separate locks.
pub trait Connection: Send + Sync + 'static {
    /// Sends raw bytes to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next frame from the remote peer, terminator removed.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

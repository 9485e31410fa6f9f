//! Per-connection handler: reader loop, writer task and cleanup.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Register the connection in the world with an outbound queue
//!   2. Spawn a writer task that drains the queue onto the socket
//!   3. Loop: receive a frame → decode → dispatch under the world lock
//!   4. On exit (close, error, idle timeout, `Close` queued) run the
//!      disconnect hooks under the world lock before returning
//!
//! A drop guard covers the panic path: if the task unwinds before step 4,
//! it runs the hooks from a spawned task. The hooks run once either way.

use std::sync::Arc;
use std::time::Duration;

use igloo_protocol::decode_frame;
use igloo_room::Outbound;
use igloo_transport::{Connection, ConnectionId, TransportError, FRAME_TERMINATOR};
use tokio::sync::{mpsc, Mutex};

use crate::config::Engine;
use crate::dispatch::{ConnectionScope, Dispatcher};
use crate::world::World;
use crate::IglooError;

/// State shared by every connection task.
pub(crate) struct Shared {
    pub(crate) world: Mutex<World>,
    pub(crate) dispatcher: Dispatcher<World>,
    /// Silence after which a connection is dropped.
    pub(crate) idle_timeout: Option<Duration>,
}

/// Drop guard that runs the disconnect hooks if the handler unwinds
/// before it could run them itself.
///
/// `Drop` is synchronous, so the fallback spawns a task for the async lock.
struct DisconnectGuard {
    scope: ConnectionScope,
    shared: Arc<Shared>,
}

impl DisconnectGuard {
    fn scope(&mut self) -> &mut ConnectionScope {
        &mut self.scope
    }
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if self.scope.is_disconnected() {
            return;
        }
        let conn_id = self.scope.conn_id();
        let mut scope = std::mem::replace(&mut self.scope, ConnectionScope::new(conn_id));
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let mut world = shared.world.lock().await;
            shared.dispatcher.disconnect(&mut world, &mut scope);
            tracing::debug!(%conn_id, online = world.online(), "connection cleaned up after unwind");
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Connection>(
    conn: C,
    engine: Engine,
    shared: Arc<Shared>,
) -> Result<(), IglooError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, ?engine, "handling new connection");

    let (tx, rx) = mpsc::unbounded_channel();
    shared.world.lock().await.register(conn_id, engine, tx);
    let mut guard = DisconnectGuard {
        scope: ConnectionScope::new(conn_id),
        shared: Arc::clone(&shared),
    };
    let mut writer = tokio::spawn(write_loop(Arc::clone(&conn), rx));

    let mut result = Ok(());
    loop {
        let received = tokio::select! {
            _ = &mut writer => {
                tracing::debug!(%conn_id, "writer finished, closing");
                break;
            }
            received = recv_frame(conn.as_ref(), shared.idle_timeout) => received,
        };

        let data = match received {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                result = Err(e.into());
                break;
            }
        };

        let packet = match decode_frame(&data) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::trace!(%conn_id, error = %e, "dropping frame");
                continue;
            }
        };

        let mut world = shared.world.lock().await;
        shared.dispatcher.dispatch(&mut world, guard.scope(), &packet);
    }

    // The world lets go of the queue here and the writer drains out.
    {
        let mut world = shared.world.lock().await;
        shared.dispatcher.disconnect(&mut world, guard.scope());
        tracing::debug!(%conn_id, online = world.online(), "connection cleaned up");
    }
    drop(guard);
    result
}

/// Receives one frame, treating a stretch of silence longer than
/// `idle_timeout` as a clean close.
async fn recv_frame<C: Connection>(
    conn: &C,
    idle_timeout: Option<Duration>,
) -> Result<Option<Vec<u8>>, TransportError> {
    let Some(limit) = idle_timeout else {
        return conn.recv().await;
    };
    match tokio::time::timeout(limit, conn.recv()).await {
        Ok(received) => received,
        Err(_) => {
            tracing::info!(conn_id = %conn.id(), "idle timeout");
            Ok(None)
        }
    }
}

/// Sends queued frames, each followed by the `\0` terminator, until the
/// queue closes or a `Close` arrives.
async fn write_loop<C: Connection>(conn: Arc<C>, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    let conn_id: ConnectionId = conn.id();
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Frame(frame) => {
                let mut bytes = frame.into_bytes();
                bytes.push(FRAME_TERMINATOR);
                if let Err(e) = conn.send(&bytes).await {
                    tracing::debug!(%conn_id, error = %e, "send failed");
                    break;
                }
            }
            Outbound::Close => {
                tracing::debug!(%conn_id, "close requested");
                break;
            }
        }
    }
    if let Err(e) = conn.close().await {
        tracing::trace!(%conn_id, error = %e, "close failed");
    }
}

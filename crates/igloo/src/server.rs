//! `IglooServer` builder and accept loops.
//!
//! This is the entry point for running an Igloo server. It ties together
//! all the layers: transport → protocol → dispatcher → world.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use igloo_session::SessionAuthority;
use igloo_transport::{TcpTransport, Transport, WebSocketTransport};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::config::{Engine, IglooConfig, TransportKind};
use crate::handler::{handle_connection, Shared};
use crate::handlers;
use crate::world::World;
use crate::IglooError;

/// Builder for configuring and starting an Igloo server.
///
/// # Example
///
/// ```rust,no_run
/// use igloo::prelude::*;
///
/// # async fn start() -> Result<(), IglooError> {
/// let config = IglooConfig::from_toml_str("")?;
/// let server = IglooServer::builder(config).build().await?;
/// server.run().await
/// # }
/// ```
pub struct IglooServerBuilder {
    config: IglooConfig,
    authority: Option<SessionAuthority>,
}

impl IglooServerBuilder {
    pub fn new(config: IglooConfig) -> Self {
        Self {
            config,
            authority: None,
        }
    }

    /// Uses `authority` instead of loading the configured account file.
    pub fn authority(mut self, authority: SessionAuthority) -> Self {
        self.authority = Some(authority);
        self
    }

    /// Builds the world and binds every configured listener.
    ///
    /// # Errors
    /// Invalid configuration, a duplicate table id or a failed bind.
    pub async fn build(self) -> Result<IglooServer, IglooError> {
        self.config.validate()?;
        let settings = self.config.server.clone();

        let world = match self.authority {
            Some(authority) => World::with_authority(self.config, authority)?,
            None => World::new(self.config)?,
        };
        let shared = Arc::new(Shared {
            world: Mutex::new(world),
            dispatcher: handlers::dispatcher(),
            idle_timeout: (settings.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(settings.idle_timeout_secs)),
        });

        let mut listeners = Vec::with_capacity(settings.listeners.len());
        for listener in &settings.listeners {
            let bound = match listener.transport {
                TransportKind::Tcp => Listener::Tcp(
                    TcpTransport::bind(&listener.bind)
                        .await?
                        .with_max_frame_len(settings.max_frame_len),
                ),
                TransportKind::WebSocket => Listener::WebSocket(
                    WebSocketTransport::bind(&listener.bind)
                        .await?
                        .with_max_frame_len(settings.max_frame_len),
                ),
            };
            listeners.push((bound, listener.engine));
        }

        Ok(IglooServer { listeners, shared })
    }
}

/// A bound listener of either transport.
enum Listener {
    Tcp(TcpTransport),
    WebSocket(WebSocketTransport),
}

impl Listener {
    fn local_addr(&self) -> Result<SocketAddr, IglooError> {
        let addr = match self {
            Self::Tcp(transport) => transport.local_addr()?,
            Self::WebSocket(transport) => transport.local_addr()?,
        };
        Ok(addr)
    }
}

/// A bound Igloo server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct IglooServer {
    listeners: Vec<(Listener, Engine)>,
    shared: Arc<Shared>,
}

impl IglooServer {
    pub fn builder(config: IglooConfig) -> IglooServerBuilder {
        IglooServerBuilder::new(config)
    }

    /// Addresses of the listeners, in configuration order.
    pub fn local_addrs(&self) -> Result<Vec<SocketAddr>, IglooError> {
        self.listeners.iter().map(|(l, _)| l.local_addr()).collect()
    }

    /// A handle for inspecting or adjusting the world while the server
    /// runs.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Runs one accept loop per listener until every loop has stopped.
    pub async fn run(self) -> Result<(), IglooError> {
        tracing::info!(listeners = self.listeners.len(), "Igloo server running");

        let mut loops = JoinSet::new();
        for (listener, engine) in self.listeners {
            let shared = Arc::clone(&self.shared);
            match listener {
                Listener::Tcp(transport) => {
                    loops.spawn(accept_loop(transport, engine, shared));
                }
                Listener::WebSocket(transport) => {
                    loops.spawn(accept_loop(transport, engine, shared));
                }
            }
        }

        while let Some(finished) = loops.join_next().await {
            if let Err(e) = finished {
                tracing::error!(error = %e, "accept loop stopped");
            }
        }
        Ok(())
    }
}

/// Cheap clone of the server's shared state.
#[derive(Clone)]
pub struct ServerHandle {
    shared: Arc<Shared>,
}

impl ServerHandle {
    /// Runs `f` with exclusive access to the world, between packets.
    pub async fn with_world<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        let mut world = self.shared.world.lock().await;
        f(&mut world)
    }
}

/// Accepts connections and spawns a handler task for each.
async fn accept_loop<T: Transport>(mut transport: T, engine: Engine, shared: Arc<Shared>) {
    loop {
        match transport.accept().await {
            Ok(conn) => {
                let shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(conn, engine, shared).await {
                        tracing::debug!(error = %e, "connection ended with error");
                    }
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
            }
        }
    }
}

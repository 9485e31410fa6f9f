//! # Igloo
//!
//! Server for the 2005-era "Engine 1" virtual world protocol: login,
//! shared rooms, chat and two-seat table games.
//!
//! The crate ties the lower layers together:
//!
//! - [`dispatch`] routes decoded packets to ordered handler chains
//! - [`world`] owns every piece of mutable state behind one lock
//! - [`handlers`] implements the protocol's routes on top of the world
//! - [`server`] binds listeners and runs a task per connection
//!
//! ```text
//! Transport (frames) → Protocol (Packet) → Dispatcher → handlers → World
//!                                                          ↓
//!                                  outbound queue → writer task → socket
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use igloo::prelude::*;
//!
//! # async fn start() -> Result<(), IglooError> {
//! let config = IglooConfig::load_from_file("igloo.toml".as_ref()).await?;
//! let server = IglooServer::builder(config).build().await?;
//! server.run().await
//! # }
//! ```

pub mod config;
pub mod dispatch;
mod error;
mod handler;
pub mod handlers;
pub mod logging;
pub mod server;
pub mod world;

pub use error::IglooError;

/// Re-exports for the common case.
pub mod prelude {
    pub use crate::config::{ConfigError, Engine, IglooConfig, TransportKind};
    pub use crate::dispatch::{ConnectionScope, Dispatcher, Flow};
    pub use crate::logging::setup_logging;
    pub use crate::server::{IglooServer, IglooServerBuilder, ServerHandle};
    pub use crate::world::{Client, Identity, World};
    pub use crate::IglooError;

    pub use igloo_protocol::{reply, ErrorCode, Packet, Reply, RoomId, TableId};
    pub use igloo_room::{Mancala, Occupant, Ruleset, Table};
    pub use igloo_session::{SessionAuthority, SessionToken};
}

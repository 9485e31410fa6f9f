//! Rooms and table games for Igloo.
//!
//! Rooms are plain data owned by a [`RoomDirectory`]. The server keeps the
//! directory inside its world state, so every operation here runs to
//! completion before the next packet is looked at and nothing needs a lock
//! of its own.
//!
//! # Key types
//!
//! - [`RoomDirectory`]: occupants ↔ rooms, presence broadcasts, table routing
//! - [`Ruleset`]: the trait a table game implements
//! - [`Table`]: seats, turns and resets for any ruleset
//! - [`GameTable`]: a table with its ruleset erased, as rooms hold it
//! - [`Mancala`]: the one ruleset shipped today
//! - [`Occupant`]: a connected player or a bot

mod directory;
mod error;
mod logic;
pub mod mancala;
mod occupant;
mod room;
mod state;
mod table;

pub use directory::{Award, RoomDirectory};
pub use error::RoomError;
pub use logic::{MoveOutcome, Ruleset};
pub use mancala::Mancala;
pub use occupant::{BotId, Occupant, Outbound, PlayerSender};
pub use room::{Member, Room};
pub use state::TableState;
pub use table::{GameTable, Recipient, Table, TableEvent, SEATS};

//! Error types for the room layer.
//!
//! Table and room operations triggered by clients fail quietly on the wire
//! (the packet is ignored), but the handler still gets a reason to log.

use igloo_protocol::{RoomId, TableId};

use crate::Occupant;

/// Errors that can occur during room and table operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The occupant is not in any room.
    #[error("{0} is not in a room")]
    NotInRoom(Occupant),

    /// The room has no table with this id.
    #[error("room {0} has no table {1}")]
    TableNotFound(RoomId, TableId),

    /// The occupant is not seated at any table.
    #[error("{0} is not at a table")]
    NotSeated(Occupant),

    /// The occupant already holds a seat somewhere.
    #[error("{0} is already seated")]
    AlreadySeated(Occupant),

    /// Both seats are taken.
    #[error("table {0} is full")]
    TableFull(TableId),

    /// The table is in a state that doesn't allow this operation.
    #[error("invalid table state for this operation: {0}")]
    InvalidState(String),

    /// The move was out of turn or rejected by the ruleset.
    #[error("illegal move {0:?}")]
    IllegalMove(String),

    /// A table with this id is already installed.
    #[error("table {0} already exists")]
    DuplicateTable(TableId),
}

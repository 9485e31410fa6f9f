//! Packet handlers, grouped by what they touch.
//!
//! [`register_all`] wires every route and the disconnect hooks into a
//! dispatcher. Handlers other than the login flow ignore connections that
//! have not logged in yet.

mod chat;
mod inventory;
mod login;
mod navigation;
mod table;

use igloo_room::{Occupant, RoomError};
use igloo_transport::ConnectionId;

use crate::dispatch::Dispatcher;
use crate::world::World;

pub use chat::contains_personal_info;

/// Registers every handler and disconnect hook.
pub fn register_all(dispatcher: &mut Dispatcher<World>) {
    login::register(dispatcher);
    navigation::register(dispatcher);
    chat::register(dispatcher);
    inventory::register(dispatcher);
    table::register(dispatcher);

    dispatcher
        .on_disconnect("leave room", leave_room)
        .on_disconnect("forget client", |world, conn| {
            world.forget(conn);
        });
}

/// A dispatcher with every handler registered.
pub fn dispatcher() -> Dispatcher<World> {
    let mut dispatcher = Dispatcher::new();
    register_all(&mut dispatcher);
    dispatcher
}

/// Releases the seat and room of a closing connection.
fn leave_room(world: &mut World, conn: ConnectionId) {
    let occupant = Occupant::Player(conn);
    let room = world.directory.room_of(occupant);
    if world.directory.leave(occupant) {
        tracing::debug!(conn_id = %conn, ?room, "released room on disconnect");
    }
}

fn logged_in(world: &World, conn: ConnectionId) -> Option<Occupant> {
    world.occupant(conn)
}

/// The id other clients know `occupant` by.
fn public_id(world: &World, occupant: Occupant) -> Option<u32> {
    world.directory.member(occupant).map(|m| m.public_id)
}

/// Logs a room action that was refused. Refusals are never reported to
/// the client.
fn ignored(result: Result<(), RoomError>, occupant: Occupant) {
    if let Err(e) = result {
        tracing::debug!(%occupant, error = %e, "room action ignored");
    }
}

//! Joining rooms, walking around and the room-wide relays (emotes, jokes,
//! snowballs).

use igloo_protocol::{reply, Packet, Reply, RoomId};
use igloo_transport::ConnectionId;

use super::{ignored, logged_in, public_id};
use crate::dispatch::{Dispatcher, Flow};
use crate::world::World;

pub(super) fn register(dispatcher: &mut Dispatcher<World>) {
    dispatcher
        .on("s%js", "join server", join_server)
        .on("s%jr", "join room", join_room)
        .on("s%sp", "set position", set_position)
        .on("s%sf", "set frame", set_frame)
        .on("s%st", "table teleport", teleport)
        .on("s%se", "emote", |w, c, p| relay(w, c, p, "se", 1))
        .on("s%sj", "joke", |w, c, p| relay(w, c, p, "sj", 1))
        .on("s%ss", "safe message", |w, c, p| relay(w, c, p, "ss", 1))
        .on("s%sa", "action", |w, c, p| relay(w, c, p, "sa", 1))
        .on("s%sb", "snowball", |w, c, p| relay(w, c, p, "sb", 2));
}

fn join_server(world: &mut World, conn: ConnectionId, _packet: &Packet) -> Flow {
    if logged_in(world, conn).is_none() {
        return Flow::Handled;
    }
    world.send(conn, &reply!("js"));
    let town = RoomId(world.config().server.town_room);
    enter(world, conn, town, 0, 0);
    Flow::Handled
}

fn join_room(world: &mut World, conn: ConnectionId, packet: &Packet) -> Flow {
    if logged_in(world, conn).is_none() {
        return Flow::Handled;
    }
    let Some(room) = packet.parse_arg::<u32>(0) else {
        return Flow::Handled;
    };
    let x = packet.parse_arg(1).unwrap_or(0);
    let y = packet.parse_arg(2).unwrap_or(0);
    enter(world, conn, RoomId(room), x, y);
    Flow::Handled
}

fn enter(world: &mut World, conn: ConnectionId, room: RoomId, x: i32, y: i32) {
    if let Some(member) = world.member(conn, x, y) {
        world.directory.join(member, room);
    }
}

fn set_position(world: &mut World, conn: ConnectionId, packet: &Packet) -> Flow {
    let Some(occupant) = logged_in(world, conn) else {
        return Flow::Handled;
    };
    if let (Some(x), Some(y)) = (packet.parse_arg(0), packet.parse_arg(1)) {
        ignored(world.directory.set_position(occupant, x, y), occupant);
    }
    Flow::Handled
}

fn set_frame(world: &mut World, conn: ConnectionId, packet: &Packet) -> Flow {
    let Some(occupant) = logged_in(world, conn) else {
        return Flow::Handled;
    };
    if let Some(frame) = packet.parse_arg(0) {
        ignored(world.directory.set_frame(occupant, frame), occupant);
    }
    Flow::Handled
}

/// Positions a player at a table seat: `x y frame`, all required.
fn teleport(world: &mut World, conn: ConnectionId, packet: &Packet) -> Flow {
    let Some(occupant) = logged_in(world, conn) else {
        return Flow::Handled;
    };
    let parsed = (packet.parse_arg(0), packet.parse_arg(1), packet.parse_arg(2));
    if let (Some(x), Some(y), Some(frame)) = parsed {
        ignored(world.directory.teleport(occupant, x, y, frame), occupant);
    }
    Flow::Handled
}

/// Echoes the first `arity` arguments to the room, prefixed with the
/// sender's public id.
fn relay(world: &mut World, conn: ConnectionId, packet: &Packet, code: &str, arity: usize) -> Flow {
    let Some(occupant) = logged_in(world, conn) else {
        return Flow::Handled;
    };
    if packet.args.len() < arity {
        return Flow::Handled;
    }
    let Some(id) = public_id(world, occupant) else {
        return Flow::Handled;
    };
    let reply = Reply::new(code).arg(id).args(&packet.args[..arity]);
    ignored(world.directory.send_room(occupant, &reply), occupant);
    Flow::Handled
}

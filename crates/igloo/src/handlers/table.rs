//! Table game routes: `s%gt`, `s%jt`, `s%lt` and the `z%` game packets.
//!
//! Invalid table actions are ignored without a reply. Coins won at a
//! finished table go to the seated players' accounts.

use igloo_protocol::{Packet, TableId};
use igloo_room::{Award, Occupant};
use igloo_transport::ConnectionId;

use super::{ignored, logged_in};
use crate::dispatch::{Dispatcher, Flow};
use crate::world::World;

pub(super) fn register(dispatcher: &mut Dispatcher<World>) {
    dispatcher
        .on("s%gt", "get tables", get_tables)
        .on("s%jt", "join table", join_table)
        .on("s%lt", "leave table", leave_table)
        .on("z%gz", "get game", get_game)
        .on("z%jz", "join game", join_game)
        .on("z%lz", "leave game", leave_game)
        .on("z%zm", "send move", send_move);
}

fn get_tables(world: &mut World, conn: ConnectionId, _packet: &Packet) -> Flow {
    if let Some(occupant) = logged_in(world, conn) {
        ignored(world.directory.get_tables(occupant), occupant);
    }
    Flow::Handled
}

fn join_table(world: &mut World, conn: ConnectionId, packet: &Packet) -> Flow {
    let (Some(occupant), Some(table)) = (logged_in(world, conn), packet.parse_arg::<u32>(0))
    else {
        return Flow::Handled;
    };
    ignored(world.directory.join_table(occupant, TableId(table)), occupant);
    Flow::Handled
}

fn leave_table(world: &mut World, conn: ConnectionId, _packet: &Packet) -> Flow {
    if let Some(occupant) = logged_in(world, conn) {
        ignored(world.directory.leave_table(occupant), occupant);
    }
    Flow::Handled
}

fn get_game(world: &mut World, conn: ConnectionId, _packet: &Packet) -> Flow {
    if let Some(occupant) = logged_in(world, conn) {
        ignored(world.directory.get_game(occupant), occupant);
    }
    Flow::Handled
}

fn join_game(world: &mut World, conn: ConnectionId, _packet: &Packet) -> Flow {
    if let Some(occupant) = logged_in(world, conn) {
        ignored(world.directory.join_game(occupant), occupant);
    }
    Flow::Handled
}

fn leave_game(world: &mut World, conn: ConnectionId, _packet: &Packet) -> Flow {
    if let Some(occupant) = logged_in(world, conn) {
        ignored(world.directory.leave_game(occupant), occupant);
    }
    Flow::Handled
}

fn send_move(world: &mut World, conn: ConnectionId, packet: &Packet) -> Flow {
    let (Some(occupant), Some(payload)) = (logged_in(world, conn), packet.arg(0)) else {
        return Flow::Handled;
    };
    match world.directory.send_move(occupant, payload) {
        Ok(awards) => pay_out(world, &awards),
        Err(e) => tracing::debug!(%occupant, error = %e, "move ignored"),
    }
    Flow::Handled
}

/// Credits table winnings. Bots have no account and earn nothing.
fn pay_out(world: &mut World, awards: &[Award]) {
    for award in awards {
        let Occupant::Player(conn) = award.occupant else {
            continue;
        };
        let Some(user) = world.identity(conn).map(|i| i.username.clone()) else {
            continue;
        };
        let balance = world.authority.add_coins(&user, award.coins);
        tracing::info!(conn_id = %conn, coins = award.coins, ?balance, "table payout");
    }
}

//! Coins, clothing and furniture.
//!
//! Economy failures answer with a result code and leave the connection
//! open.

use igloo_protocol::{reply, ErrorCode, Packet, Reply};
use igloo_session::SessionError;
use igloo_transport::ConnectionId;

use crate::dispatch::{Dispatcher, Flow};
use crate::world::World;

/// Minigame score points per coin.
const SCORE_PER_COIN: u32 = 10;

pub(super) fn register(dispatcher: &mut Dispatcher<World>) {
    dispatcher
        .on_once("s%gi", "inventory", get_inventory)
        .on("s%gc", "coins", get_coins)
        .on("s%ai", "buy item", buy_item)
        .on("s%gf", "furniture", get_furniture)
        .on("s%af", "buy furniture", buy_furniture)
        .on("z%zo", "minigame payout", minigame_payout);
}

/// Account key of a logged-in connection.
fn username(world: &World, conn: ConnectionId) -> Option<String> {
    world.identity(conn).map(|i| i.username.clone())
}

/// Left unclaimed before login so the one answer per connection is kept
/// for the logged-in request.
fn get_inventory(world: &mut World, conn: ConnectionId, _packet: &Packet) -> Flow {
    let Some(user) = username(world, conn) else {
        return Flow::Continue;
    };
    let reply = Reply::new("gi").args(world.authority().items(&user));
    world.send(conn, &reply);
    Flow::Handled
}

fn get_coins(world: &mut World, conn: ConnectionId, _packet: &Packet) -> Flow {
    let Some(user) = username(world, conn) else {
        return Flow::Handled;
    };
    let coins = world.authority().coins(&user);
    world.send(conn, &reply!("gc", coins));
    Flow::Handled
}

fn get_furniture(world: &mut World, conn: ConnectionId, _packet: &Packet) -> Flow {
    let Some(user) = username(world, conn) else {
        return Flow::Handled;
    };
    let reply = Reply::new("gf").args(world.authority().furniture(&user));
    world.send(conn, &reply);
    Flow::Handled
}

fn buy_item(world: &mut World, conn: ConnectionId, packet: &Packet) -> Flow {
    let (Some(user), Some(item)) = (username(world, conn), packet.parse_arg::<u32>(0)) else {
        return Flow::Handled;
    };
    let Some(cost) = world.config().catalog.item_cost(item) else {
        world.send_error(conn, ErrorCode::ItemNotFound, None);
        return Flow::Handled;
    };
    match world.authority.buy_item(&user, item, cost) {
        Ok(coins) => world.send(conn, &reply!("ai", item, coins)),
        Err(e) => purchase_failed(world, conn, &e),
    }
    Flow::Handled
}

fn buy_furniture(world: &mut World, conn: ConnectionId, packet: &Packet) -> Flow {
    let (Some(user), Some(furniture)) = (username(world, conn), packet.parse_arg::<u32>(0))
    else {
        return Flow::Handled;
    };
    let catalog = &world.config().catalog;
    let (Some(cost), limit) = (catalog.furniture_cost(furniture), catalog.furniture_limit) else {
        world.send_error(conn, ErrorCode::ItemNotFound, None);
        return Flow::Handled;
    };
    match world.authority.buy_furniture(&user, furniture, cost, limit) {
        Ok(coins) => world.send(conn, &reply!("af", furniture, coins)),
        Err(e) => purchase_failed(world, conn, &e),
    }
    Flow::Handled
}

/// Credits the coins a finished minigame earned: one per ten points.
fn minigame_payout(world: &mut World, conn: ConnectionId, packet: &Packet) -> Flow {
    let Some(user) = username(world, conn) else {
        return Flow::Handled;
    };
    let score = packet.parse_arg::<u32>(0).unwrap_or(0);
    let earned = score / SCORE_PER_COIN;
    let balance = world.authority.add_coins(&user, earned);
    tracing::debug!(conn_id = %conn, score, earned, ?balance, "minigame payout");
    world.send(conn, &reply!("zo"));
    Flow::Handled
}

fn purchase_failed(world: &World, conn: ConnectionId, error: &SessionError) {
    tracing::debug!(conn_id = %conn, %error, "purchase refused");
    let code = match error {
        SessionError::InsufficientCoins { .. } => ErrorCode::InsufficientCoins,
        SessionError::FurnitureLimit(_) => ErrorCode::FurnitureLimit,
        _ => ErrorCode::ItemNotFound,
    };
    world.send_error(conn, code, None);
}

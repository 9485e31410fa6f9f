//! Pre-login XML handshake and the login pipeline.
//!
//! Every rejection sends its result code and closes the connection.

use igloo_protocol::{reply, xml, ErrorCode, Packet};
use igloo_session::CredentialVariant;
use igloo_transport::ConnectionId;

use crate::config::Engine;
use crate::dispatch::{Dispatcher, Flow};
use crate::world::{Identity, World};

pub(super) fn register(dispatcher: &mut Dispatcher<World>) {
    dispatcher
        .on("sys%verChk", "version check", version_check)
        .on("sys%rndK", "random key", random_key)
        .on("sys%login", "login", login);
}

fn version_check(world: &mut World, conn: ConnectionId, _packet: &Packet) -> Flow {
    world.send_raw(conn, xml::API_OK.to_string());
    Flow::Handled
}

fn random_key(world: &mut World, conn: ConnectionId, _packet: &Packet) -> Flow {
    let key = xml::random_key(&world.config().login.random_key);
    world.send_raw(conn, key);
    Flow::Handled
}

fn reject(world: &World, conn: ConnectionId, code: ErrorCode, payload: Option<&str>) -> Flow {
    world.send_error(conn, code, payload);
    world.close(conn);
    Flow::Handled
}

fn login(world: &mut World, conn: ConnectionId, packet: &Packet) -> Flow {
    let Some(engine) = world.client(conn).map(|c| c.engine) else {
        return Flow::Handled;
    };
    if world.identity(conn).is_some() {
        tracing::debug!(conn_id = %conn, "second login on one connection ignored");
        return Flow::Handled;
    }
    let (Some(nick), Some(password)) = (packet.arg(0), packet.arg(1)) else {
        tracing::debug!(conn_id = %conn, "login without credentials, closing");
        world.close(conn);
        return Flow::Handled;
    };

    // Pre-2006 clients send spaces in names as underscores.
    let display_name = match engine {
        Engine::Engine1 => nick.replace('_', " "),
        _ => nick.to_string(),
    };

    let rules = world.name_rules();
    if rules.is_too_long(&display_name) {
        tracing::info!(conn_id = %conn, name = %display_name, "login denied: nickname too long");
        let message = format!("Nickname may not exceed {} characters.", rules.max_len);
        return reject(world, conn, ErrorCode::IncorrectPassword, Some(&message));
    }
    if rules.is_inappropriate(&display_name) {
        let reason = format!("Account banned for inappropriate username: {display_name}");
        return auto_ban(world, conn, &display_name, &reason);
    }
    if rules.is_reserved(&display_name) {
        tracing::info!(conn_id = %conn, name = %display_name, "login denied: reserved name");
        return reject(world, conn, ErrorCode::NameNotAvailable, None);
    }

    if let Some(ban) = world.authority.check_ban_status(&display_name) {
        tracing::info!(conn_id = %conn, name = %display_name, kind = ?ban.kind, "login denied: banned");
        return reject(world, conn, ban.kind.error_code(), Some(&ban.message));
    }

    let authority = &mut world.authority;
    match engine {
        Engine::Engine1 => {
            if !authority.account_exists(&display_name) {
                tracing::info!(conn_id = %conn, name = %display_name, "login denied: no account");
                return reject(world, conn, ErrorCode::NameNotFound, None);
            }
            if !authority.validate_and_consume_token(&display_name, password) {
                tracing::info!(conn_id = %conn, name = %display_name, "login denied: bad session token");
                return reject(world, conn, ErrorCode::IncorrectPassword, None);
            }
        }
        _ if authority.account_exists(&display_name) => {
            let variant = if engine.learns_alternate_password() {
                CredentialVariant::LearnsAlternate
            } else {
                CredentialVariant::Strict
            };
            if !authority.verify_with_variant(&display_name, password, variant) {
                tracing::info!(conn_id = %conn, name = %display_name, "login denied: incorrect password");
                return reject(world, conn, ErrorCode::IncorrectPassword, None);
            }
        }
        _ => {
            authority.create_account(&display_name, password);
        }
    }

    let bait = world
        .authority
        .items(&display_name)
        .iter()
        .copied()
        .find(|item| world.config().login.bait_items.contains(item));
    if let Some(item) = bait {
        let reason = format!("Account banned for possessing bait item {item}");
        return auto_ban(world, conn, &display_name, &reason);
    }

    let Some(player_id) = world.authority.player_id(&display_name) else {
        return reject(world, conn, ErrorCode::NameNotFound, None);
    };
    world.bind_identity(
        conn,
        Identity {
            username: display_name.to_lowercase(),
            display_name: display_name.clone(),
            player_id,
        },
    );

    let worlds = world.config().world_list();
    world.send(conn, &reply!("l", player_id, player_id, "", worlds));
    tracing::info!(conn_id = %conn, name = %display_name, %player_id, ?engine, "logged in");
    Flow::Handled
}

/// Bans `name` one step further up the ladder and turns the client away.
fn auto_ban(world: &mut World, conn: ConnectionId, name: &str, reason: &str) -> Flow {
    let outcome = world.authority.issue_escalating_ban(name, reason);
    tracing::warn!(conn_id = %conn, name, reason, kind = ?outcome.kind, "automatic ban");
    let payload = outcome.expires_at_iso().unwrap_or_else(|| reason.to_string());
    reject(world, conn, outcome.kind.error_code(), Some(&payload))
}

//! Chat: `s%sm <id> <message>`.
//!
//! Three handlers share the route and run in order: the personal-info
//! filter, moderator commands, and finally the room broadcast. The first
//! two claim the packet when they act on it.

use igloo_protocol::{reply, ErrorCode, Packet};
use igloo_transport::ConnectionId;

use super::{ignored, logged_in, public_id};
use crate::dispatch::{Dispatcher, Flow};
use crate::world::World;

/// Prefix that turns a chat line into a command.
const COMMAND_PREFIX: char = '!';
/// Digits in a row that look like a phone number.
const PHONE_DIGITS: usize = 7;
const MODERATOR_BAN_REASON: &str = "Banned by moderator";

pub(super) fn register(dispatcher: &mut Dispatcher<World>) {
    dispatcher
        .on("s%sm", "personal info filter", filter_personal_info)
        .on("s%sm", "moderator commands", run_command)
        .on("s%sm", "room chat", broadcast);
}

fn filter_personal_info(world: &mut World, conn: ConnectionId, packet: &Packet) -> Flow {
    if logged_in(world, conn).is_none() {
        return Flow::Handled;
    }
    let Some(message) = packet.arg(1) else {
        return Flow::Continue;
    };
    if !contains_personal_info(message) {
        return Flow::Continue;
    }
    tracing::info!(conn_id = %conn, "chat blocked: personal information");
    world.send_error(conn, ErrorCode::PersonalInfo, None);
    Flow::Handled
}

fn run_command(world: &mut World, conn: ConnectionId, packet: &Packet) -> Flow {
    let Some(line) = packet.arg(1).and_then(|m| m.strip_prefix(COMMAND_PREFIX)) else {
        return Flow::Continue;
    };
    let Some(issuer) = world.identity(conn).map(|i| i.username.clone()) else {
        return Flow::Handled;
    };

    let (command, target) = match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    match command.to_ascii_lowercase().as_str() {
        "ban" | "unban" if !world.authority.is_moderator(&issuer) => {
            tracing::warn!(conn_id = %conn, %issuer, command, "unauthorized command");
            world.send_error(conn, ErrorCode::Unauthorized, None);
        }
        "ban" if !target.is_empty() => ban(world, &issuer, target),
        "unban" if !target.is_empty() => {
            let lifted = world.authority.clear_ban(target);
            tracing::info!(%issuer, target, lifted, "moderator unban");
        }
        _ => tracing::debug!(conn_id = %conn, command, "unknown command"),
    }
    // Commands never reach the room.
    Flow::Handled
}

fn ban(world: &mut World, issuer: &str, target: &str) {
    if !world.authority.set_ban(target, MODERATOR_BAN_REASON, None) {
        tracing::info!(issuer, target, "ban target has no account");
        return;
    }
    tracing::warn!(issuer, target, "moderator ban");
    if let Some(victim) = world.connection_of(target) {
        world.send_error(victim, ErrorCode::PermanentBan, Some(MODERATOR_BAN_REASON));
        world.close(victim);
    }
}

fn broadcast(world: &mut World, conn: ConnectionId, packet: &Packet) -> Flow {
    let Some(occupant) = logged_in(world, conn) else {
        return Flow::Handled;
    };
    let (Some(message), Some(id)) = (packet.arg(1), public_id(world, occupant)) else {
        return Flow::Handled;
    };
    ignored(world.directory.send_room(occupant, &reply!("sm", id, message)), occupant);
    Flow::Handled
}

/// Whether `message` looks like it carries an email address or a phone
/// number. Spaces and dashes between digits don't break a run.
pub fn contains_personal_info(message: &str) -> bool {
    let email = message.split_whitespace().any(|word| {
        word.split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'))
    });
    if email {
        return true;
    }

    let mut run = 0;
    for c in message.chars() {
        if c.is_ascii_digit() {
            run += 1;
            if run >= PHONE_DIGITS {
                return true;
            }
        } else if c != ' ' && c != '-' {
            run = 0;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_personal_info_email() {
        assert!(contains_personal_info("mail me at pengu@ice.net ok"));
        assert!(!contains_personal_info("meet @ the dock."));
        assert!(!contains_personal_info("@everyone hi"));
    }

    #[test]
    fn test_contains_personal_info_phone_runs() {
        assert!(contains_personal_info("call 555-123-4567"));
        assert!(contains_personal_info("5551234"));
        assert!(!contains_personal_info("i have 500 coins and 12 pins"));
        assert!(!contains_personal_info("room 111 table 100"));
    }
}

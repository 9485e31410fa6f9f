//! Who can be in a room, and how frames reach them.

use std::fmt;

use igloo_transport::ConnectionId;
use tokio::sync::mpsc;

/// Id of a simulated occupant. Bots live in the room like players but have
/// no socket behind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BotId(pub u32);

impl fmt::Display for BotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anything that can stand in a room or sit at a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Occupant {
    Player(ConnectionId),
    Bot(BotId),
}

impl Occupant {
    pub fn is_bot(&self) -> bool {
        matches!(self, Self::Bot(_))
    }
}

impl fmt::Display for Occupant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player(conn) => write!(f, "player {conn}"),
            Self::Bot(id) => write!(f, "bot {id}"),
        }
    }
}

impl From<ConnectionId> for Occupant {
    fn from(conn: ConnectionId) -> Self {
        Self::Player(conn)
    }
}

impl From<BotId> for Occupant {
    fn from(id: BotId) -> Self {
        Self::Bot(id)
    }
}

/// What a connection's writer task is asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// An encoded frame, without the terminator.
    Frame(String),
    /// Flush everything queued before this, then close the socket.
    Close,
}

/// Channel sender for delivering outbound frames to a player.
pub type PlayerSender = mpsc::UnboundedSender<Outbound>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupant_display_names_kind() {
        let player = Occupant::from(ConnectionId::new(4));
        let bot = Occupant::from(BotId(9));
        assert_eq!(player.to_string(), "player conn-4");
        assert_eq!(bot.to_string(), "bot 9");
        assert!(bot.is_bot());
        assert!(!player.is_bot());
    }
}

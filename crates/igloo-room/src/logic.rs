//! The `Ruleset` trait: the game-specific half of a table.
//!
//! A table has two halves. Seats, turns, starting, resetting and every
//! packet a table sends are the same for every two-seat game and live in
//! [`Table`](crate::Table). What the board looks like, which moves are
//! legal and who won differ per game and live behind this trait.
//!
//! Like the rest of the room layer, a ruleset holds no state of its own:
//! every function receives the board it works on.

use std::fmt;

/// What a move did, as far as the table is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The mover plays again.
    pub keeps_turn: bool,
    /// Outcome code echoed to the table with the move (`""` for a plain
    /// move).
    pub code: &'static str,
}

impl MoveOutcome {
    /// A move that passes the turn and has nothing to report.
    pub const PLAIN: Self = Self {
        keeps_turn: false,
        code: "",
    };
}

/// The rules of a two-seat, turn-based board game.
///
/// Seats are `0` and `1`. Implementors never see connections, names or
/// packets; the table translates between those and the board.
pub trait Ruleset: Send + Sync + 'static {
    /// Short name used in logs and configuration (e.g. `"mancala"`).
    const NAME: &'static str;

    /// The full board state.
    type Board: Clone + fmt::Debug + Send + Sync;

    /// One parsed move. Its `Display` form is what the table echoes back.
    type Move: Copy + fmt::Debug + fmt::Display + Send;

    /// A board at the start of a game.
    fn new_board() -> Self::Board;

    /// Parses a move payload from the client. `None` means the packet is
    /// ignored.
    fn parse_move(payload: &str) -> Option<Self::Move>;

    /// Whether `seat` may play `mv` on `board`. Turn order is already
    /// checked by the table.
    fn is_legal(board: &Self::Board, seat: usize, mv: Self::Move) -> bool;

    /// Plays a legal move.
    fn apply(board: &mut Self::Board, seat: usize, mv: Self::Move) -> MoveOutcome;

    /// Returns `true` once the game is over.
    fn is_finished(board: &Self::Board) -> bool;

    /// Coins owed to each seat when the game ends.
    fn payouts(board: &Self::Board) -> [u32; 2];

    /// The board as sent in the `gz` reply.
    fn encode_board(board: &Self::Board) -> String;
}

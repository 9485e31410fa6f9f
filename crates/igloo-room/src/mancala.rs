//! Mancala (Kalah flavor) as played at the Book Room tables.
//!
//! Board layout, indices as sent on the wire:
//!
//! ```text
//!        12 11 10  9  8  7
//!    13                      6
//!         0  1  2  3  4  5
//! ```
//!
//! Seat 0 plays pits 0-5 into store 6, seat 1 plays pits 7-12 into
//! store 13. Pits start with four stones each.

use crate::{MoveOutcome, Ruleset};

pub const PITS: usize = 14;
pub const STONES_PER_PIT: u32 = 4;

const FREE_TURN: &str = "f";
const CAPTURE: &str = "c";

/// Store (mancala) index for `seat`.
pub fn store_of(seat: usize) -> usize {
    if seat == 0 { 6 } else { 13 }
}

/// Playable pit range for `seat`.
pub fn side_of(seat: usize) -> std::ops::Range<usize> {
    if seat == 0 { 0..6 } else { 7..13 }
}

/// The pit across the board from `pit` (0 ↔ 12, 5 ↔ 7).
pub fn opposite(pit: usize) -> usize {
    12 - pit
}

/// The Mancala ruleset.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mancala;

impl Ruleset for Mancala {
    const NAME: &'static str = "mancala";

    type Board = [u32; PITS];
    type Move = usize;

    fn new_board() -> Self::Board {
        let mut board = [STONES_PER_PIT; PITS];
        board[store_of(0)] = 0;
        board[store_of(1)] = 0;
        board
    }

    fn parse_move(payload: &str) -> Option<usize> {
        payload.trim().parse().ok().filter(|pit| *pit < PITS)
    }

    fn is_legal(board: &Self::Board, seat: usize, pit: usize) -> bool {
        side_of(seat).contains(&pit) && board[pit] > 0
    }

    fn apply(board: &mut Self::Board, seat: usize, pit: usize) -> MoveOutcome {
        let own_store = store_of(seat);
        let other_store = store_of(1 - seat);

        let mut stones = std::mem::take(&mut board[pit]);
        let mut hole = pit;
        while stones > 0 {
            hole = (hole + 1) % PITS;
            if hole == other_store {
                continue;
            }
            board[hole] += 1;
            stones -= 1;
        }

        if hole == own_store {
            return MoveOutcome {
                keeps_turn: true,
                code: FREE_TURN,
            };
        }

        let across = opposite(hole);
        if side_of(seat).contains(&hole) && board[hole] == 1 && board[across] > 0 {
            board[own_store] += board[across] + 1;
            board[hole] = 0;
            board[across] = 0;
            return MoveOutcome {
                keeps_turn: false,
                code: CAPTURE,
            };
        }

        MoveOutcome::PLAIN
    }

    fn is_finished(board: &Self::Board) -> bool {
        side_of(0).all(|i| board[i] == 0) || side_of(1).all(|i| board[i] == 0)
    }

    /// Each seat collects its own six pits plus its store.
    fn payouts(board: &Self::Board) -> [u32; 2] {
        [board[0..7].iter().sum(), board[7..14].iter().sum()]
    }

    fn encode_board(board: &Self::Board) -> String {
        board
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

//! Table lifecycle states.

use std::fmt;

/// Lifecycle state of a table.
///
/// ```text
/// Empty ──seat──► WaitingForSecondSeat ──seat──► (two seated, not started)
///                                                 │ a seated player sends jz
///                                                 ▼
///   ◄────────── reset (game over, quit) ──── InProgress
/// ```
///
/// Two seated players still report `WaitingForSecondSeat` until one of
/// them sends `jz`: the game only counts as in progress once it has
/// started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    /// Nobody is seated.
    Empty,
    /// Someone is seated but the game hasn't started.
    WaitingForSecondSeat,
    /// A game is being played.
    InProgress,
}

impl TableState {
    /// Returns `true` if new occupants may take a seat.
    pub fn accepts_seats(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::WaitingForSecondSeat => write!(f, "WaitingForSecondSeat"),
            Self::InProgress => write!(f, "InProgress"),
        }
    }
}

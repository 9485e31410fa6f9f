//! Two-seat game tables.
//!
//! [`Table`] implements everything a table does regardless of the game
//! played on it: seating, the start handshake, turn order, resets and the
//! packets that go with them. The game itself is a [`Ruleset`].
//!
//! A table never touches sockets. Every operation returns the
//! [`TableEvent`]s it produced and the room directory delivers them. That
//! keeps tables testable without a runtime and lets the directory decide
//! what "the room" means at delivery time.
//!
//! Rooms hold tables as `Box<dyn GameTable>`, so one room can mix games.

use std::fmt;

use igloo_protocol::{reply, Reply, TableId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Occupant, RoomError, Ruleset, TableState};

/// Seats per table.
pub const SEATS: usize = 2;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Who a table frame is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// One occupant.
    Occupant(Occupant),
    /// Everyone seated at the table when the event was produced.
    Occupants(Vec<Occupant>),
    /// Everyone in the room the table belongs to.
    Room,
}

/// Something a table operation wants to happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    Send(Recipient, Reply),
    /// A finished game pays out coins to a seat.
    Award { occupant: Occupant, coins: u32 },
}

// ---------------------------------------------------------------------------
// GameTable
// ---------------------------------------------------------------------------

/// The table operations a room needs, with the ruleset erased.
///
/// Operations that clients trigger return `Err` when the request is not
/// valid right now. Callers log the reason and otherwise ignore the
/// packet; nothing has changed in that case.
pub trait GameTable: fmt::Debug + Send + Sync {
    fn id(&self) -> TableId;

    /// The ruleset's name.
    fn game(&self) -> &'static str;

    fn state(&self) -> TableState;

    /// Seated occupants, in seat order.
    fn seated(&self) -> Vec<Occupant>;

    fn seat_of(&self, occupant: Occupant) -> Option<usize>;

    /// `<id>|<seated count>`, as listed by `gt`.
    fn summary(&self) -> String {
        format!("{}|{}", self.id(), self.seated().len())
    }

    /// Takes the next free seat (`s%jt`).
    fn seat(&mut self, occupant: Occupant, name: &str) -> Result<Vec<TableEvent>, RoomError>;

    /// Gives up a seat (`s%lt`, leaving the room, disconnecting).
    fn leave(&mut self, occupant: Occupant) -> Result<Vec<TableEvent>, RoomError>;

    /// The `gz` snapshot for a seated occupant.
    fn get_game(&self, occupant: Occupant) -> Result<Vec<TableEvent>, RoomError>;

    /// Signals readiness to play (`z%jz`).
    fn join_game(&mut self, occupant: Occupant) -> Result<Vec<TableEvent>, RoomError>;

    /// Acknowledges `z%lz`.
    fn leave_game(&self, occupant: Occupant) -> Result<Vec<TableEvent>, RoomError>;

    /// Plays a move (`z%zm`).
    fn make_move(
        &mut self,
        occupant: Occupant,
        payload: &str,
    ) -> Result<Vec<TableEvent>, RoomError>;
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Seat {
    occupant: Occupant,
    name: String,
}

/// A table playing ruleset `R`.
pub struct Table<R: Ruleset> {
    id: TableId,
    seats: Vec<Seat>,
    started: bool,
    current_turn: usize,
    board: R::Board,
    rng: StdRng,
}

impl<R: Ruleset> Table<R> {
    /// A fresh table seeded from the OS.
    pub fn new(id: TableId) -> Self {
        Self::with_rng(id, StdRng::from_os_rng())
    }

    /// A table whose first-turn picks are reproducible.
    pub fn with_seed(id: TableId, seed: u64) -> Self {
        Self::with_rng(id, StdRng::seed_from_u64(seed))
    }

    fn with_rng(id: TableId, mut rng: StdRng) -> Self {
        let current_turn = rng.random_range(0..SEATS);
        Self {
            id,
            seats: Vec::with_capacity(SEATS),
            started: false,
            current_turn,
            board: R::new_board(),
            rng,
        }
    }

    /// Seat whose move is expected next.
    pub fn current_turn(&self) -> usize {
        self.current_turn
    }

    pub fn board(&self) -> &R::Board {
        &self.board
    }

    /// Replaces the board. Test setups use this to reach endgames.
    pub fn set_board(&mut self, board: R::Board) {
        self.board = board;
    }

    fn occupants(&self) -> Vec<Occupant> {
        self.seats.iter().map(|s| s.occupant).collect()
    }

    fn seat_index(&self, occupant: Occupant) -> Result<usize, RoomError> {
        self.seat_of(occupant).ok_or(RoomError::NotSeated(occupant))
    }

    fn to_table(&self, reply: Reply) -> TableEvent {
        TableEvent::Send(Recipient::Occupants(self.occupants()), reply)
    }

    /// Clears every seat, the board and the started flag, and picks a new
    /// first turn. `quitter` is announced with `cz` first.
    fn reset(&mut self, quitter: Option<&str>) -> Vec<TableEvent> {
        let mut events = Vec::new();
        if let Some(name) = quitter {
            events.push(self.to_table(reply!("cz", name)));
        }
        for remaining in (0..self.seats.len()).rev() {
            events.push(TableEvent::Send(
                Recipient::Room,
                reply!("ut", self.id, remaining),
            ));
        }
        self.seats.clear();
        self.started = false;
        self.current_turn = self.rng.random_range(0..SEATS);
        self.board = R::new_board();

        tracing::debug!(table_id = %self.id, game = R::NAME, "table reset");
        events
    }
}

impl<R: Ruleset> fmt::Debug for Table<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("id", &self.id)
            .field("game", &R::NAME)
            .field("seats", &self.seats)
            .field("started", &self.started)
            .field("current_turn", &self.current_turn)
            .field("board", &self.board)
            .finish_non_exhaustive()
    }
}

impl<R: Ruleset> GameTable for Table<R> {
    fn id(&self) -> TableId {
        self.id
    }

    fn game(&self) -> &'static str {
        R::NAME
    }

    fn state(&self) -> TableState {
        if self.started {
            TableState::InProgress
        } else if self.seats.is_empty() {
            TableState::Empty
        } else {
            TableState::WaitingForSecondSeat
        }
    }

    fn seated(&self) -> Vec<Occupant> {
        self.occupants()
    }

    fn seat_of(&self, occupant: Occupant) -> Option<usize> {
        self.seats.iter().position(|s| s.occupant == occupant)
    }

    fn seat(&mut self, occupant: Occupant, name: &str) -> Result<Vec<TableEvent>, RoomError> {
        if self.seat_of(occupant).is_some() {
            return Err(RoomError::AlreadySeated(occupant));
        }
        if !self.state().accepts_seats() {
            return Err(RoomError::InvalidState(format!(
                "table {} is {}",
                self.id,
                self.state()
            )));
        }
        if self.seats.len() >= SEATS {
            return Err(RoomError::TableFull(self.id));
        }

        let seat = self.seats.len();
        self.seats.push(Seat {
            occupant,
            name: name.to_string(),
        });
        tracing::debug!(table_id = %self.id, %occupant, seat, "seated");

        Ok(vec![
            TableEvent::Send(Recipient::Occupant(occupant), reply!("jt", self.id, seat)),
            TableEvent::Send(Recipient::Room, reply!("ut", self.id, self.seats.len())),
        ])
    }

    fn leave(&mut self, occupant: Occupant) -> Result<Vec<TableEvent>, RoomError> {
        let seat = self.seat_index(occupant)?;

        if self.started {
            let name = self.seats[seat].name.clone();
            tracing::info!(table_id = %self.id, %occupant, "player quit a running game");
            return Ok(self.reset(Some(&name)));
        }

        self.seats.remove(seat);
        tracing::debug!(table_id = %self.id, %occupant, "left table");
        Ok(vec![TableEvent::Send(
            Recipient::Room,
            reply!("ut", self.id, self.seats.len()),
        )])
    }

    fn get_game(&self, occupant: Occupant) -> Result<Vec<TableEvent>, RoomError> {
        self.seat_index(occupant)?;

        let mut names = [""; SEATS];
        for (slot, seat) in names.iter_mut().zip(&self.seats) {
            *slot = seat.name.as_str();
        }
        let mut snapshot = Reply::new("gz")
            .args(names)
            .arg(R::encode_board(&self.board));
        if self.started {
            snapshot = snapshot.arg(self.current_turn);
        }
        Ok(vec![TableEvent::Send(Recipient::Occupant(occupant), snapshot)])
    }

    fn join_game(&mut self, occupant: Occupant) -> Result<Vec<TableEvent>, RoomError> {
        let seat = self.seat_index(occupant)?;
        if self.started {
            return Err(RoomError::InvalidState(format!(
                "table {} already started",
                self.id
            )));
        }

        let mut events = vec![
            TableEvent::Send(Recipient::Occupant(occupant), reply!("jz", seat)),
            self.to_table(reply!("uz", seat, &self.seats[seat].name)),
        ];

        if self.seats.len() == SEATS {
            self.started = true;
            events.push(self.to_table(reply!("sz", self.current_turn)));
            tracing::info!(
                table_id = %self.id,
                game = R::NAME,
                first_turn = self.current_turn,
                "game started"
            );
        }
        Ok(events)
    }

    fn leave_game(&self, occupant: Occupant) -> Result<Vec<TableEvent>, RoomError> {
        self.seat_index(occupant)?;
        Ok(vec![TableEvent::Send(Recipient::Occupant(occupant), reply!("lz"))])
    }

    fn make_move(
        &mut self,
        occupant: Occupant,
        payload: &str,
    ) -> Result<Vec<TableEvent>, RoomError> {
        if !self.started {
            return Err(RoomError::InvalidState(format!(
                "table {} has no game running",
                self.id
            )));
        }
        let seat = self.seat_index(occupant)?;
        if seat != self.current_turn {
            return Err(RoomError::IllegalMove(format!("{payload} out of turn")));
        }
        let mv = R::parse_move(payload)
            .filter(|mv| R::is_legal(&self.board, seat, *mv))
            .ok_or_else(|| RoomError::IllegalMove(payload.to_string()))?;

        let turn = self.current_turn;
        let outcome = R::apply(&mut self.board, seat, mv);
        if !outcome.keeps_turn {
            self.current_turn = (self.current_turn + 1) % SEATS;
        }

        let mut events = vec![self.to_table(reply!("zm", turn, mv, outcome.code))];

        if R::is_finished(&self.board) {
            let payouts = R::payouts(&self.board);
            for (seat, coins) in self.seats.iter().zip(payouts) {
                events.push(TableEvent::Award {
                    occupant: seat.occupant,
                    coins,
                });
            }
            events.push(self.to_table(reply!("zo")));
            tracing::info!(
                table_id = %self.id,
                game = R::NAME,
                ?payouts,
                "game over"
            );
            events.extend(self.reset(None));
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mancala::{Mancala, PITS};
    use igloo_transport::ConnectionId;

    fn player(n: u64) -> Occupant {
        Occupant::Player(ConnectionId::new(n))
    }

    fn replies(events: &[TableEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                TableEvent::Send(_, reply) => Some(reply.encode()),
                TableEvent::Award { .. } => None,
            })
            .collect()
    }

    fn started_table() -> Table<Mancala> {
        let mut table = Table::<Mancala>::with_seed(TableId(100), 7);
        table.seat(player(1), "Alice").unwrap();
        table.seat(player(2), "Bob").unwrap();
        table.join_game(player(1)).unwrap();
        table
    }

    #[test]
    fn test_seat_replies_and_updates_room() {
        let mut table = Table::<Mancala>::with_seed(TableId(100), 1);
        let events = table.seat(player(1), "Alice").unwrap();
        assert_eq!(
            events,
            vec![
                TableEvent::Send(Recipient::Occupant(player(1)), reply!("jt", 100, 0)),
                TableEvent::Send(Recipient::Room, reply!("ut", 100, 1)),
            ]
        );
        assert_eq!(table.state(), TableState::WaitingForSecondSeat);
        assert_eq!(table.summary(), "100|1");
    }

    #[test]
    fn test_seat_third_occupant_is_rejected() {
        let mut table = Table::<Mancala>::with_seed(TableId(100), 1);
        table.seat(player(1), "Alice").unwrap();
        table.seat(player(2), "Bob").unwrap();
        assert_eq!(
            table.seat(player(3), "Carol"),
            Err(RoomError::TableFull(TableId(100)))
        );
        assert_eq!(table.seated(), vec![player(1), player(2)]);
    }

    #[test]
    fn test_seat_twice_is_rejected() {
        let mut table = Table::<Mancala>::with_seed(TableId(100), 1);
        table.seat(player(1), "Alice").unwrap();
        assert_eq!(
            table.seat(player(1), "Alice"),
            Err(RoomError::AlreadySeated(player(1)))
        );
    }

    #[test]
    fn test_join_game_starts_once_with_two_seated() {
        let mut table = Table::<Mancala>::with_seed(TableId(100), 3);
        table.seat(player(1), "Alice").unwrap();
        let events = table.join_game(player(1)).unwrap();
        assert_eq!(replies(&events), vec!["%xt%jz%-1%0%", "%xt%uz%-1%0%Alice%"]);
        assert_eq!(table.state(), TableState::WaitingForSecondSeat);

        table.seat(player(2), "Bob").unwrap();
        let events = table.join_game(player(2)).unwrap();
        let turn = table.current_turn();
        assert_eq!(
            replies(&events),
            vec![
                "%xt%jz%-1%1%".to_string(),
                "%xt%uz%-1%1%Bob%".to_string(),
                format!("%xt%sz%-1%{turn}%"),
            ]
        );
        assert_eq!(table.state(), TableState::InProgress);

        assert!(table.join_game(player(1)).is_err());
    }

    #[test]
    fn test_join_game_unseated_is_ignored() {
        let mut table = Table::<Mancala>::with_seed(TableId(100), 3);
        assert_eq!(
            table.join_game(player(9)),
            Err(RoomError::NotSeated(player(9)))
        );
    }

    #[test]
    fn test_get_game_includes_turn_only_when_started() {
        let mut table = Table::<Mancala>::with_seed(TableId(100), 3);
        table.seat(player(1), "Alice").unwrap();
        let events = table.get_game(player(1)).unwrap();
        assert_eq!(
            replies(&events),
            vec!["%xt%gz%-1%Alice%%4,4,4,4,4,4,0,4,4,4,4,4,4,0%"]
        );

        let table = started_table();
        let turn = table.current_turn();
        let events = table.get_game(player(2)).unwrap();
        assert_eq!(
            replies(&events),
            vec![format!(
                "%xt%gz%-1%Alice%Bob%4,4,4,4,4,4,0,4,4,4,4,4,4,0%{turn}%"
            )]
        );
    }

    #[test]
    fn test_make_move_out_of_turn_is_ignored() {
        let mut table = started_table();
        let waiting = if table.current_turn() == 0 { player(2) } else { player(1) };
        let before = *table.board();
        assert!(matches!(
            table.make_move(waiting, "2"),
            Err(RoomError::IllegalMove(_))
        ));
        assert_eq!(*table.board(), before);
    }

    #[test]
    fn test_make_move_broadcasts_and_advances_turn() {
        let mut table = started_table();
        let turn = table.current_turn();
        let (mover, pit) = if turn == 0 { (player(1), 0) } else { (player(2), 7) };

        let events = table.make_move(mover, &pit.to_string()).unwrap();
        assert_eq!(
            events,
            vec![TableEvent::Send(
                Recipient::Occupants(vec![player(1), player(2)]),
                reply!("zm", turn, pit, ""),
            )]
        );
        assert_eq!(table.current_turn(), 1 - turn);
    }

    #[test]
    fn test_make_move_free_turn_keeps_turn() {
        let mut table = started_table();
        let turn = table.current_turn();
        let (mover, pit) = if turn == 0 { (player(1), 2) } else { (player(2), 9) };
        // Four stones from pit 2 end in store 6; from pit 9 in store 13.
        let events = table.make_move(mover, &pit.to_string()).unwrap();
        assert_eq!(replies(&events), vec![format!("%xt%zm%-1%{turn}%{pit}%f%")]);
        assert_eq!(table.current_turn(), turn);
    }

    #[test]
    fn test_make_move_rejects_opponent_pit() {
        let mut table = started_table();
        let turn = table.current_turn();
        let (mover, pit) = if turn == 0 { (player(1), "9") } else { (player(2), "2") };
        assert!(table.make_move(mover, pit).is_err());
        assert!(table.make_move(mover, "x").is_err());
    }

    #[test]
    fn test_make_move_final_move_pays_out_and_resets() {
        let mut table = started_table();
        let turn = table.current_turn();
        let mut board = [0; PITS];
        let (mover, pit) = if turn == 0 {
            board[5] = 1;
            board[6] = 20;
            board[10] = 3;
            board[13] = 24;
            (player(1), 5)
        } else {
            board[12] = 1;
            board[13] = 20;
            board[3] = 3;
            board[6] = 24;
            (player(2), 12)
        };
        table.set_board(board);

        let events = table.make_move(mover, &pit.to_string()).unwrap();
        let awards: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TableEvent::Award { occupant, coins } => Some((*occupant, *coins)),
                TableEvent::Send(..) => None,
            })
            .collect();
        if turn == 0 {
            assert_eq!(awards, vec![(player(1), 21), (player(2), 27)]);
        } else {
            assert_eq!(awards, vec![(player(1), 27), (player(2), 21)]);
        }
        assert_eq!(
            replies(&events),
            vec![
                format!("%xt%zm%-1%{turn}%{pit}%f%"),
                "%xt%zo%-1%".to_string(),
                "%xt%ut%-1%100%1%".to_string(),
                "%xt%ut%-1%100%0%".to_string(),
            ]
        );
        assert_eq!(table.state(), TableState::Empty);
        assert_eq!(*table.board(), Mancala::new_board());
    }

    #[test]
    fn test_leave_running_game_resets_without_payout() {
        let mut table = started_table();
        let events = table.leave(player(2)).unwrap();
        assert_eq!(
            replies(&events),
            vec!["%xt%cz%-1%Bob%", "%xt%ut%-1%100%1%", "%xt%ut%-1%100%0%"]
        );
        assert!(!events.iter().any(|e| matches!(e, TableEvent::Award { .. })));
        assert_eq!(table.state(), TableState::Empty);
    }

    #[test]
    fn test_leave_before_start_frees_seat() {
        let mut table = Table::<Mancala>::with_seed(TableId(101), 1);
        table.seat(player(1), "Alice").unwrap();
        table.seat(player(2), "Bob").unwrap();
        let events = table.leave(player(1)).unwrap();
        assert_eq!(replies(&events), vec!["%xt%ut%-1%101%1%"]);
        assert_eq!(table.seat_of(player(2)), Some(0));
        assert_eq!(table.leave(player(1)), Err(RoomError::NotSeated(player(1))));
    }
}

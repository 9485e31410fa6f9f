//! The room directory: which occupant is in which room, and every
//! operation that moves occupants around.
//!
//! An occupant is in at most one room. The directory keeps an
//! occupant → room index so lookups don't scan every room; table
//! membership is not indexed and is found by asking the room's tables.

use std::collections::{BTreeMap, HashMap};

use igloo_protocol::{reply, Reply, RoomId, TableId};

use crate::{BotId, GameTable, Member, Occupant, Room, RoomError, TableEvent};

/// Coins a finished table game owes an occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Award {
    pub occupant: Occupant,
    pub coins: u32,
}

/// Every room on the server.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: BTreeMap<RoomId, Room>,
    occupant_rooms: HashMap<Occupant, RoomId>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    /// The room `occupant` is in.
    pub fn room_of(&self, occupant: Occupant) -> Option<RoomId> {
        self.occupant_rooms.get(&occupant).copied()
    }

    /// The table `occupant` is seated at.
    pub fn table_of(&self, occupant: Occupant) -> Option<TableId> {
        let room = self.rooms.get(&self.room_of(occupant)?)?;
        room.table_of(occupant)
    }

    /// Members of `room`, empty if the room doesn't exist.
    pub fn occupants(&self, room: RoomId) -> &[Member] {
        self.rooms.get(&room).map(Room::members).unwrap_or_default()
    }

    pub fn member(&self, occupant: Occupant) -> Option<&Member> {
        self.rooms.get(&self.room_of(occupant)?)?.member(occupant)
    }

    /// Total occupants across all rooms.
    pub fn population(&self) -> usize {
        self.occupant_rooms.len()
    }

    /// Adds a table to `room`, creating the room if needed.
    ///
    /// # Errors
    /// [`RoomError::DuplicateTable`] if the room already has a table with
    /// that id.
    pub fn install_table(
        &mut self,
        room: RoomId,
        table: Box<dyn GameTable>,
    ) -> Result<(), RoomError> {
        let id = table.id();
        let game = table.game();
        let inserted = self
            .rooms
            .entry(room)
            .or_insert_with(|| Room::new(room))
            .insert_table(table);
        if !inserted {
            return Err(RoomError::DuplicateTable(id));
        }
        tracing::debug!(room_id = %room, table_id = %id, game, "table installed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Presence
    // -----------------------------------------------------------------------

    /// Moves `member` into `room`, leaving whatever room it was in first.
    ///
    /// The room's current members get `ap` with the newcomer's string; the
    /// newcomer gets `jr` with everyone's, its own included.
    pub fn join(&mut self, member: Member, room: RoomId) {
        let occupant = member.occupant;
        self.leave(occupant);

        let target = self.rooms.entry(room).or_insert_with(|| Room::new(room));
        target.broadcast(&reply!("ap", member.occupant_string()));
        target.add_member(member);

        let listing = Reply::new("jr")
            .arg(room)
            .args(target.members().iter().map(Member::occupant_string));
        target.send_to(occupant, &listing);

        self.occupant_rooms.insert(occupant, room);
        tracing::info!(
            room_id = %room,
            %occupant,
            population = target.population(),
            "joined room"
        );
    }

    /// Places a simulated occupant in `room`.
    pub fn add_bot(&mut self, room: RoomId, id: BotId, name: &str, x: i32, y: i32) {
        let member = Member::new(Occupant::Bot(id), id.0, name, None).at(x, y);
        self.join(member, room);
    }

    /// Takes `occupant` out of its room, giving up any table seat first.
    /// Returns `false` if it wasn't in a room.
    pub fn leave(&mut self, occupant: Occupant) -> bool {
        let Some(room_id) = self.occupant_rooms.remove(&occupant) else {
            return false;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return false;
        };

        if let Some(table_id) = room.table_of(occupant) {
            if let Some(table) = room.table_mut(table_id) {
                match table.leave(occupant) {
                    Ok(events) => {
                        deliver(room, events);
                    }
                    Err(e) => {
                        tracing::debug!(%occupant, error = %e, "seat release failed");
                    }
                }
            }
        }

        if let Some(member) = room.remove_member(occupant) {
            room.broadcast(&reply!("rp", member.public_id));
        }
        tracing::info!(
            room_id = %room_id,
            %occupant,
            population = room.population(),
            "left room"
        );
        true
    }

    /// Moves `occupant` and tells the room (`sp`).
    pub fn set_position(&mut self, occupant: Occupant, x: i32, y: i32) -> Result<(), RoomError> {
        let room = self.room_mut_of(occupant)?;
        let member = room
            .member_mut(occupant)
            .ok_or(RoomError::NotInRoom(occupant))?;
        member.x = x;
        member.y = y;
        let update = reply!("sp", member.public_id, x, y);
        room.broadcast(&update);
        Ok(())
    }

    /// Changes `occupant`'s animation frame and tells the room (`sf`).
    pub fn set_frame(&mut self, occupant: Occupant, frame: u32) -> Result<(), RoomError> {
        let room = self.room_mut_of(occupant)?;
        let member = room
            .member_mut(occupant)
            .ok_or(RoomError::NotInRoom(occupant))?;
        member.frame = frame;
        let update = reply!("sf", member.public_id, frame);
        room.broadcast(&update);
        Ok(())
    }

    /// Places `occupant` at a table position in one step (`st`).
    pub fn teleport(
        &mut self,
        occupant: Occupant,
        x: i32,
        y: i32,
        frame: u32,
    ) -> Result<(), RoomError> {
        let room = self.room_mut_of(occupant)?;
        let member = room
            .member_mut(occupant)
            .ok_or(RoomError::NotInRoom(occupant))?;
        member.x = x;
        member.y = y;
        member.frame = frame;
        let update = reply!("st", member.public_id, x, y, frame);
        room.broadcast(&update);
        Ok(())
    }

    /// Sends `reply` to everyone in `occupant`'s room, `occupant` included.
    pub fn send_room(&self, occupant: Occupant, reply: &Reply) -> Result<(), RoomError> {
        self.room_ref_of(occupant)?.broadcast(reply);
        Ok(())
    }

    /// Sends `reply` to one occupant, wherever it is.
    pub fn send_to(&self, occupant: Occupant, reply: &Reply) {
        if let Ok(room) = self.room_ref_of(occupant) {
            room.send_to(occupant, reply);
        }
    }

    // -----------------------------------------------------------------------
    // Tables
    // -----------------------------------------------------------------------

    /// Replies `gt` with every table in the occupant's room. Rooms without
    /// tables send nothing.
    pub fn get_tables(&self, occupant: Occupant) -> Result<(), RoomError> {
        let room = self.room_ref_of(occupant)?;
        if !room.has_tables() {
            return Ok(());
        }
        let listing = Reply::new("gt").args(room.tables().map(|t| t.summary()));
        room.send_to(occupant, &listing);
        Ok(())
    }

    /// Seats `occupant` at `table` in its current room.
    pub fn join_table(&mut self, occupant: Occupant, table: TableId) -> Result<(), RoomError> {
        let room_id = self.room_of(occupant).ok_or(RoomError::NotInRoom(occupant))?;
        let room = self.room_mut_of(occupant)?;
        if room.table_of(occupant).is_some() {
            return Err(RoomError::AlreadySeated(occupant));
        }
        let name = room
            .member(occupant)
            .map(|m| m.name.clone())
            .ok_or(RoomError::NotInRoom(occupant))?;
        let events = room
            .table_mut(table)
            .ok_or(RoomError::TableNotFound(room_id, table))?
            .seat(occupant, &name)?;
        deliver(room, events);
        Ok(())
    }

    /// Gives up `occupant`'s seat.
    pub fn leave_table(&mut self, occupant: Occupant) -> Result<(), RoomError> {
        self.with_table(occupant, |table| table.leave(occupant))
            .map(drop)
    }

    pub fn get_game(&mut self, occupant: Occupant) -> Result<(), RoomError> {
        self.with_table(occupant, |table| table.get_game(occupant))
            .map(drop)
    }

    pub fn join_game(&mut self, occupant: Occupant) -> Result<(), RoomError> {
        self.with_table(occupant, |table| table.join_game(occupant))
            .map(drop)
    }

    pub fn leave_game(&mut self, occupant: Occupant) -> Result<(), RoomError> {
        self.with_table(occupant, |table| table.leave_game(occupant))
            .map(drop)
    }

    /// Plays a move. A move that ends the game returns the coins owed.
    pub fn send_move(
        &mut self,
        occupant: Occupant,
        payload: &str,
    ) -> Result<Vec<Award>, RoomError> {
        self.with_table(occupant, |table| table.make_move(occupant, payload))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn room_ref_of(&self, occupant: Occupant) -> Result<&Room, RoomError> {
        self.room_of(occupant)
            .and_then(|id| self.rooms.get(&id))
            .ok_or(RoomError::NotInRoom(occupant))
    }

    fn room_mut_of(&mut self, occupant: Occupant) -> Result<&mut Room, RoomError> {
        self.room_of(occupant)
            .and_then(|id| self.rooms.get_mut(&id))
            .ok_or(RoomError::NotInRoom(occupant))
    }

    /// Resolves the occupant's room and table, runs `op` on the table and
    /// delivers what it produced.
    fn with_table<F>(&mut self, occupant: Occupant, op: F) -> Result<Vec<Award>, RoomError>
    where
        F: FnOnce(&mut (dyn GameTable + 'static)) -> Result<Vec<TableEvent>, RoomError>,
    {
        let room = self.room_mut_of(occupant)?;
        let table_id = room.table_of(occupant).ok_or(RoomError::NotSeated(occupant))?;
        let table = room
            .table_mut(table_id)
            .ok_or(RoomError::NotSeated(occupant))?;
        let events = op(&mut **table)?;
        Ok(deliver(room, events))
    }
}

/// Sends a table's frames within `room` and hands back its awards.
fn deliver(room: &Room, events: Vec<TableEvent>) -> Vec<Award> {
    let mut awards = Vec::new();
    for event in events {
        match event {
            TableEvent::Send(recipient, reply) => room.dispatch(&recipient, &reply),
            TableEvent::Award { occupant, coins } => awards.push(Award { occupant, coins }),
        }
    }
    awards
}

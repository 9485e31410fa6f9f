//! A single room: its members, its tables, and frame delivery.

use std::collections::BTreeMap;

use igloo_protocol::{Reply, RoomId, TableId};

use crate::{GameTable, Occupant, Outbound, PlayerSender, Recipient};

/// Body color every occupant string reports. Clothing is not modelled.
const DEFAULT_COLOR: u32 = 1;

/// Someone standing in a room.
#[derive(Debug, Clone)]
pub struct Member {
    pub occupant: Occupant,
    /// Id shown to clients: the account id for players, the bot id for bots.
    pub public_id: u32,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub frame: u32,
    sender: Option<PlayerSender>,
}

impl Member {
    /// A member standing at the origin in frame 1.
    pub fn new(
        occupant: Occupant,
        public_id: u32,
        name: &str,
        sender: Option<PlayerSender>,
    ) -> Self {
        Self {
            occupant,
            public_id,
            name: name.to_string(),
            x: 0,
            y: 0,
            frame: 1,
            sender,
        }
    }

    /// Where the member appears on arrival.
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// The pipe-separated description sent in `ap` and `jr`:
    /// `id|name|color|head|face|neck|body|hand|feet|pin|background|x|y|frame|member`.
    pub fn occupant_string(&self) -> String {
        format!(
            "{}|{}|{}|0|0|0|0|0|0|0|0|{}|{}|{}|1",
            self.public_id, self.name, DEFAULT_COLOR, self.x, self.y, self.frame
        )
    }

    /// Queues a frame for this member. Bots and closed connections drop it.
    pub fn send(&self, reply: &Reply) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(Outbound::Frame(reply.encode()));
        }
    }
}

/// A room and everything in it.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    members: Vec<Member>,
    tables: BTreeMap<TableId, Box<dyn GameTable>>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            members: Vec::new(),
            tables: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Members in join order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, occupant: Occupant) -> Option<&Member> {
        self.members.iter().find(|m| m.occupant == occupant)
    }

    pub(crate) fn member_mut(&mut self, occupant: Occupant) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.occupant == occupant)
    }

    pub fn contains(&self, occupant: Occupant) -> bool {
        self.member(occupant).is_some()
    }

    pub fn population(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn add_member(&mut self, member: Member) {
        self.members.push(member);
    }

    pub(crate) fn remove_member(&mut self, occupant: Occupant) -> Option<Member> {
        let index = self.members.iter().position(|m| m.occupant == occupant)?;
        Some(self.members.remove(index))
    }

    pub fn tables(&self) -> impl Iterator<Item = &dyn GameTable> {
        self.tables.values().map(|t| t.as_ref())
    }

    pub fn has_tables(&self) -> bool {
        !self.tables.is_empty()
    }

    pub fn table(&self, id: TableId) -> Option<&dyn GameTable> {
        self.tables.get(&id).map(|t| t.as_ref())
    }

    pub(crate) fn table_mut(&mut self, id: TableId) -> Option<&mut Box<dyn GameTable>> {
        self.tables.get_mut(&id)
    }

    pub(crate) fn insert_table(&mut self, table: Box<dyn GameTable>) -> bool {
        let id = table.id();
        if self.tables.contains_key(&id) {
            return false;
        }
        self.tables.insert(id, table);
        true
    }

    /// The table `occupant` is seated at, if any.
    pub fn table_of(&self, occupant: Occupant) -> Option<TableId> {
        self.tables
            .values()
            .find(|t| t.seat_of(occupant).is_some())
            .map(|t| t.id())
    }

    /// Delivers a frame to the members named by `recipient`. Occupants who
    /// are no longer in this room are skipped.
    pub fn dispatch(&self, recipient: &Recipient, reply: &Reply) {
        match recipient {
            Recipient::Room => self.broadcast(reply),
            Recipient::Occupant(occupant) => self.send_to(*occupant, reply),
            Recipient::Occupants(occupants) => {
                for occupant in occupants {
                    self.send_to(*occupant, reply);
                }
            }
        }
    }

    /// Sends to every member.
    pub fn broadcast(&self, reply: &Reply) {
        for member in &self.members {
            member.send(reply);
        }
    }

    pub fn send_to(&self, occupant: Occupant, reply: &Reply) {
        if let Some(member) = self.member(occupant) {
            member.send(reply);
        }
    }
}

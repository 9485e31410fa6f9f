//! The world: all mutable server state, owned in one place.
//!
//! Connections, accounts, rooms and tables live in a single [`World`]
//! that the server keeps behind one mutex. A handler gets `&mut World`
//! for the whole of one packet, so everything it does (check a ban, then
//! issue one; seat a player, then start the game) is atomic with respect
//! to every other connection.
//!
//! Handlers never write to sockets. They queue [`Outbound`] frames on the
//! connection's channel and the connection's writer task delivers them.

use std::collections::HashMap;

use igloo_protocol::{ErrorCode, PlayerId, Reply, RoomId, TableId};
use igloo_room::{
    GameTable, Mancala, Member, Occupant, Outbound, PlayerSender, RoomDirectory, Table,
};
use igloo_session::{AccountStore, NameRules, SessionAuthority};
use igloo_transport::ConnectionId;

use crate::config::{Engine, IglooConfig};
use crate::IglooError;

/// Who a connection logged in as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Account key (lowercase).
    pub username: String,
    /// Name shown to other players.
    pub display_name: String,
    pub player_id: PlayerId,
}

/// One live connection.
#[derive(Debug)]
pub struct Client {
    pub id: ConnectionId,
    /// Client generation of the listener it came in on.
    pub engine: Engine,
    /// `None` until login succeeds.
    pub identity: Option<Identity>,
    sender: PlayerSender,
}

impl Client {
    fn queue(&self, outbound: Outbound) {
        if self.sender.send(outbound).is_err() {
            tracing::trace!(conn_id = %self.id, "writer gone, frame dropped");
        }
    }
}

/// Everything the handlers read and mutate.
#[derive(Debug)]
pub struct World {
    config: IglooConfig,
    name_rules: NameRules,
    pub(crate) authority: SessionAuthority,
    pub(crate) directory: RoomDirectory,
    clients: HashMap<ConnectionId, Client>,
}

impl World {
    /// Builds the world from configuration: loads the account store and
    /// wires every configured table into its room.
    ///
    /// # Errors
    /// [`IglooError::Room`] if two tables in one room share an id.
    pub fn new(config: IglooConfig) -> Result<Self, IglooError> {
        let store = match &config.accounts.path {
            Some(path) => AccountStore::load(path),
            None => AccountStore::in_memory(),
        };
        let authority = SessionAuthority::new(store, config.authority_config());
        Self::with_authority(config, authority)
    }

    /// Like [`new`](Self::new) with an already built authority.
    pub fn with_authority(
        config: IglooConfig,
        authority: SessionAuthority,
    ) -> Result<Self, IglooError> {
        let mut directory = RoomDirectory::new();
        for settings in &config.tables {
            for id in settings.first_id..settings.first_id.saturating_add(settings.count) {
                let table: Box<dyn GameTable> = Box::new(Table::<Mancala>::new(TableId(id)));
                directory.install_table(RoomId(settings.room), table)?;
            }
        }
        tracing::info!(
            tables = config.tables.iter().map(|t| t.count).sum::<u32>(),
            "world ready"
        );

        Ok(Self {
            name_rules: config.name_rules(),
            config,
            authority,
            directory,
            clients: HashMap::new(),
        })
    }

    pub fn config(&self) -> &IglooConfig {
        &self.config
    }

    pub fn name_rules(&self) -> &NameRules {
        &self.name_rules
    }

    pub fn authority(&self) -> &SessionAuthority {
        &self.authority
    }

    pub fn authority_mut(&mut self) -> &mut SessionAuthority {
        &mut self.authority
    }

    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    /// Starts tracking a freshly accepted connection.
    pub fn register(&mut self, id: ConnectionId, engine: Engine, sender: PlayerSender) {
        self.clients.insert(
            id,
            Client {
                id,
                engine,
                identity: None,
                sender,
            },
        );
        tracing::debug!(conn_id = %id, ?engine, online = self.clients.len(), "client registered");
    }

    /// Stops tracking a connection. Room and table cleanup is the caller's.
    pub fn forget(&mut self, id: ConnectionId) -> Option<Client> {
        let client = self.clients.remove(&id);
        if client.is_some() {
            tracing::debug!(conn_id = %id, online = self.clients.len(), "client forgotten");
        }
        client
    }

    pub fn client(&self, id: ConnectionId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn online(&self) -> usize {
        self.clients.len()
    }

    pub fn identity(&self, id: ConnectionId) -> Option<&Identity> {
        self.clients.get(&id)?.identity.as_ref()
    }

    /// Binds a logged-in identity to the connection.
    pub(crate) fn bind_identity(&mut self, id: ConnectionId, identity: Identity) {
        if let Some(client) = self.clients.get_mut(&id) {
            client.identity = Some(identity);
        }
    }

    /// The connection logged in as `username`, if any.
    pub fn connection_of(&self, username: &str) -> Option<ConnectionId> {
        let username = username.to_lowercase();
        self.clients
            .values()
            .find(|c| c.identity.as_ref().is_some_and(|i| i.username == username))
            .map(|c| c.id)
    }

    /// The occupant a logged-in connection appears as in rooms.
    pub fn occupant(&self, id: ConnectionId) -> Option<Occupant> {
        self.identity(id).map(|_| Occupant::Player(id))
    }

    /// A room member for a logged-in connection, standing at `(x, y)`.
    pub(crate) fn member(&self, id: ConnectionId, x: i32, y: i32) -> Option<Member> {
        let client = self.clients.get(&id)?;
        let identity = client.identity.as_ref()?;
        let member = Member::new(
            Occupant::Player(id),
            identity.player_id.0,
            &identity.display_name,
            Some(client.sender.clone()),
        );
        Some(member.at(x, y))
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    /// Queues an XT frame for one connection.
    pub fn send(&self, id: ConnectionId, reply: &Reply) {
        self.send_raw(id, reply.encode());
    }

    /// Queues a pre-rendered frame (the XML handshake replies).
    pub fn send_raw(&self, id: ConnectionId, frame: String) {
        if let Some(client) = self.clients.get(&id) {
            client.queue(Outbound::Frame(frame));
        }
    }

    pub fn send_error(&self, id: ConnectionId, code: ErrorCode, payload: Option<&str>) {
        tracing::debug!(conn_id = %id, %code, "sending error");
        self.send(id, &Reply::error(code, payload));
    }

    /// Closes the connection once everything queued before has been sent.
    pub fn close(&self, id: ConnectionId) {
        if let Some(client) = self.clients.get(&id) {
            client.queue(Outbound::Close);
        }
    }
}

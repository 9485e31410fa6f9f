//! Core protocol types for the Engine 1 wire format.
//!
//! Inbound traffic is decoded into a [`Packet`]; outbound traffic is built as
//! a [`Reply`]. Both are plain data. The numeric identifiers that show up in
//! packet arguments (rooms, tables, players) get newtypes so they can't be
//! mixed up in signatures, and their `Display` prints the bare number
//! because that is what goes on the wire.

use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A persistent player (account) id, as sent in the `l` login reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A room id. Rooms are the shared spaces clients walk around in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A table id. Unique across the whole server, not just within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Packet: one decoded inbound frame
// ---------------------------------------------------------------------------

/// A handler key: `namespace%command`, e.g. `s%jt` or `sys%login`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route(String);

impl Route {
    /// Builds the route for a namespace/command pair.
    pub fn new(namespace: &str, command: &str) -> Self {
        Self(format!("{namespace}%{command}"))
    }

    /// The `namespace%command` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Route {
    /// Accepts an already joined `namespace%command` string.
    fn from(route: &str) -> Self {
        Self(route.to_string())
    }
}

/// One inbound message, produced per frame and not retained.
///
/// Arguments stay strings; handlers parse what they need and ignore the
/// packet when parsing fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Handler namespace (`s` for server/world, `z` for game, `sys` for XML).
    pub namespace: String,
    /// Command code within the namespace.
    pub command: String,
    /// Positional arguments.
    pub args: Vec<String>,
}

impl Packet {
    /// Creates a packet from its parts.
    pub fn new(
        namespace: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            command: command.into(),
            args,
        }
    }

    /// The dispatcher key for this packet.
    pub fn route(&self) -> Route {
        Route::new(&self.namespace, &self.command)
    }

    /// Argument `index` as a string slice.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Argument `index` parsed as `T`. `None` if missing or unparsable.
    pub fn parse_arg<T: FromStr>(&self, index: usize) -> Option<T> {
        self.arg(index)?.trim().parse().ok()
    }
}

// ---------------------------------------------------------------------------
// Reply: one outbound XT frame
// ---------------------------------------------------------------------------

/// A server → client XT frame: `%xt%<code>%-1%<arg>%<arg>%`.
///
/// Built with [`Reply::new`] and [`Reply::arg`], or the [`reply!`](crate::reply)
/// macro for mixed argument types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code, e.g. `jt` or `zm`.
    pub code: String,
    /// Positional arguments, already rendered.
    pub args: Vec<String>,
}

impl Reply {
    /// A reply with no arguments yet.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.args.push(value.to_string());
        self
    }

    /// Appends every item of `values` as its own argument.
    pub fn args<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        self.args.extend(values.into_iter().map(|v| v.to_string()));
        self
    }

    /// The error frame `%xt%e%-1%<code>%[<payload>%]`.
    pub fn error(code: ErrorCode, payload: Option<&str>) -> Self {
        let reply = Self::new("e").arg(code.code());
        match payload {
            Some(payload) => reply.arg(payload),
            None => reply,
        }
    }

    /// Renders the frame body (without the transport terminator).
    pub fn encode(&self) -> String {
        let mut out = format!("%xt%{}%-1%", self.code);
        for arg in &self.args {
            out.push_str(arg);
            out.push('%');
        }
        out
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Numeric result codes sent on the `e` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// 100: no account for that name.
    NameNotFound,
    /// 101: wrong password, bad session token or over-long nickname.
    IncorrectPassword,
    /// 401: not enough coins.
    InsufficientCoins,
    /// 402: unknown catalog id.
    ItemNotFound,
    /// 441: reserved (mascot or staff) name.
    NameNotAvailable,
    /// 450: too many furniture items.
    FurnitureLimit,
    /// 600: temporary ban; payload is the expiry.
    TemporaryBan,
    /// 610: privileged command from an unprivileged player.
    Unauthorized,
    /// 680: permanent ban; payload is the reason.
    PermanentBan,
    /// 913: chat message rejected by the personal-information filter.
    PersonalInfo,
}

impl ErrorCode {
    /// The numeric wire value.
    pub fn code(self) -> u16 {
        match self {
            Self::NameNotFound => 100,
            Self::IncorrectPassword => 101,
            Self::InsufficientCoins => 401,
            Self::ItemNotFound => 402,
            Self::NameNotAvailable => 441,
            Self::FurnitureLimit => 450,
            Self::TemporaryBan => 600,
            Self::Unauthorized => 610,
            Self::PermanentBan => 680,
            Self::PersonalInfo => 913,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

//! Error types for the protocol layer.
//!
//! Every variant here means "this frame is not something we understand".
//! The connection handler drops such frames without replying, so the
//! variants exist for logging, not for the client.

/// Errors that can occur while decoding an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The frame is not valid UTF-8.
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    /// The frame starts like neither an XT nor an XML message. Stray HTTP
    /// requests hitting the game port end up here.
    #[error("not a protocol frame")]
    NotAPacket,

    /// The frame starts with `%` but its first segment is not `xt`.
    #[error("not an xt frame (leading segment {0:?})")]
    NotXt(String),

    /// The frame is recognizable but missing a required part.
    #[error("malformed frame: {0}")]
    Malformed(String),
}

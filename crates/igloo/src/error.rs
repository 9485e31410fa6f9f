//! Unified error type for the Igloo server.

use igloo_protocol::ProtocolError;
use igloo_room::RoomError;
use igloo_session::SessionError;
use igloo_transport::TransportError;

use crate::config::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum IglooError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame that could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An account or persistence error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room or table error.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::FrameTooLong { limit: 16 };
        let igloo_err: IglooError = err.into();
        assert!(matches!(igloo_err, IglooError::Transport(_)));
        assert!(igloo_err.to_string().contains("16 bytes"));
    }

    #[test]
    fn test_from_protocol_error() {
        let igloo_err: IglooError = ProtocolError::NotXt("msg".into()).into();
        assert!(matches!(igloo_err, IglooError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::UnknownAccount("nobody".into());
        let igloo_err: IglooError = err.into();
        assert!(matches!(igloo_err, IglooError::Session(_)));
        assert!(igloo_err.to_string().contains("nobody"));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::TableFull(igloo_protocol::TableId(100));
        let igloo_err: IglooError = err.into();
        assert!(matches!(igloo_err, IglooError::Room(_)));
    }
}

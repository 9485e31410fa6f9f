//! Transport failures.

use std::io;

/// Why a listener or connection stopped working.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("send failed: {0}")]
    SendFailed(#[source] io::Error),

    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),

    /// Binding the listener, accepting a socket or upgrading it failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] io::Error),

    /// A frame grew past the listener's limit before its terminator
    /// arrived. The connection is dropped.
    #[error("frame exceeds {limit} bytes")]
    FrameTooLong { limit: usize },
}

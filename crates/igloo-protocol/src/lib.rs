//! Wire protocol for Igloo.
//!
//! This crate defines the "language" the legacy client and the server
//! speak:
//!
//! - **Types** ([`Packet`], [`Reply`], [`ErrorCode`], id newtypes): what
//!   travels on the wire, in decoded form.
//! - **Codec** ([`decode_frame`], [`Packet::encode`], [`Reply::encode`]):
//!   how frames turn into packets and replies turn into frames.
//! - **XML** ([`xml`]): the pre-login system frames.
//! - **Errors** ([`ProtocolError`]): why a frame was not understood.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the
//! dispatcher (routes). It has no side effects and knows nothing about
//! connections, rooms or accounts.
//!
//! ```text
//! Transport (frame bytes) → Protocol (Packet) → Dispatcher (handlers)
//! ```

mod codec;
mod error;
mod types;
pub mod xml;

pub use codec::{decode_frame, decode_xt};
pub use error::ProtocolError;
pub use types::{ErrorCode, Packet, PlayerId, Reply, RoomId, Route, TableId};

/// Builds a [`Reply`] from a code and any number of `Display` arguments.
///
/// ```rust
/// use igloo_protocol::reply;
///
/// let frame = reply!("zm", 0, 3, "f").encode();
/// assert_eq!(frame, "%xt%zm%-1%0%3%f%");
/// ```
#[macro_export]
macro_rules! reply {
    ($code:expr $(, $arg:expr)* $(,)?) => {
        $crate::Reply::new($code)$(.arg($arg))*
    };
}

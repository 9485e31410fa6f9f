//! Frame codec: raw inbound frame → [`Packet`], and the XT encoding.
//!
//! Two frame kinds share one socket. XML frames (`<msg t="sys">...`) carry
//! the pre-login handshake; XT frames (`%xt%...`) carry everything after.
//! [`decode_frame`] picks the right decoder from the first byte so the
//! dispatcher can treat both uniformly.
//!
//! The XT layout is `%xt%<namespace>%<command>%-1%<arg0>%...%`: a leading
//! empty segment, the `xt` marker, namespace, command, a fixed `-1`
//! placeholder (a room id slot the client never fills), then the arguments
//! and a trailing `%`.

use crate::{xml, Packet, ProtocolError};

/// Decodes one frame (terminator already removed) into a [`Packet`].
///
/// # Errors
/// Any [`ProtocolError`]; callers drop the frame and keep the connection.
pub fn decode_frame(frame: &[u8]) -> Result<Packet, ProtocolError> {
    let text =
        std::str::from_utf8(frame).map_err(|_| ProtocolError::InvalidUtf8)?;
    let text = text.trim_start();
    match text.as_bytes().first() {
        Some(b'%') => decode_xt(text),
        Some(b'<') => xml::decode(text),
        _ => Err(ProtocolError::NotAPacket),
    }
}

/// Decodes an XT frame.
pub fn decode_xt(frame: &str) -> Result<Packet, ProtocolError> {
    let mut segments = frame.split('%');

    // Leading empty segment before the first `%`.
    match segments.next() {
        Some("") => {}
        _ => return Err(ProtocolError::NotAPacket),
    }
    match segments.next() {
        Some("xt") => {}
        Some(other) => return Err(ProtocolError::NotXt(other.to_string())),
        None => return Err(ProtocolError::NotAPacket),
    }

    let namespace = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProtocolError::Malformed("missing namespace".into()))?;
    let command = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProtocolError::Malformed("missing command".into()))?;

    // The `-1` placeholder; its value is never used.
    segments.next();

    let mut args: Vec<String> = segments.map(str::to_string).collect();
    if args.last().is_some_and(String::is_empty) {
        args.pop();
    }

    Ok(Packet::new(namespace, command, args))
}

impl Packet {
    /// Decodes an XT frame. Shorthand for [`decode_xt`].
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        decode_xt(frame)
    }

    /// Encodes the packet back into the inbound XT layout.
    ///
    /// Arguments containing `%` are not escaped and will not survive a
    /// round trip; the legacy client never sends them.
    pub fn encode(&self) -> String {
        let mut out = format!("%xt%{}%{}%-1%", self.namespace, self.command);
        for arg in &self.args {
            out.push_str(arg);
            out.push('%');
        }
        out
    }
}

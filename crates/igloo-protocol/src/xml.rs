//! XML system frames used before login.
//!
//! The client opens with a version check, asks for a random key and then
//! sends its credentials:
//!
//! ```text
//! <msg t="sys"><body action="verChk" r="0"><ver v="153" /></body></msg>
//! <msg t="sys"><body action="rndK" r="-1"></body></msg>
//! <msg t="sys"><body action="login" r="0"><login z="w1">
//!   <nick><![CDATA[name]]></nick><pword><![CDATA[pass]]></pword>
//! </login></body></msg>
//! ```
//!
//! Only the `action` attribute and the two CDATA fields matter, so this is
//! a targeted scanner rather than a general XML parser. Decoded frames land
//! in the [`SYS_NAMESPACE`] so they route like XT packets: `sys%login` has
//! the nickname as argument 0 and the password as argument 1 when present.

use crate::{Packet, ProtocolError};

/// Namespace assigned to decoded XML frames.
pub const SYS_NAMESPACE: &str = "sys";

/// Reply to `verChk`: every client version is accepted.
pub const API_OK: &str = r#"<msg t="sys"><body action="apiOK" r="0"></body></msg>"#;

/// Reply to `rndK` carrying `key`.
pub fn random_key(key: &str) -> String {
    format!(r#"<msg t="sys"><body action="rndK" r="-1"><k>{key}</k></body></msg>"#)
}

/// Decodes an XML system frame.
pub fn decode(frame: &str) -> Result<Packet, ProtocolError> {
    let action = attribute(frame, "body", "action")
        .filter(|a| !a.is_empty())
        .ok_or(ProtocolError::NotAPacket)?;

    let mut args = Vec::new();
    if let Some(nick) = cdata(frame, "nick") {
        args.push(nick.to_string());
        if let Some(pword) = cdata(frame, "pword") {
            args.push(pword.to_string());
        }
    }

    Ok(Packet::new(SYS_NAMESPACE, action, args))
}

/// Value of `attr` on the first `<tag ...>` element.
fn attribute<'a>(frame: &'a str, tag: &str, attr: &str) -> Option<&'a str> {
    let open = format!("<{tag}");
    let start = frame.find(&open)? + open.len();
    let end = start + frame[start..].find('>')?;
    let element = &frame[start..end];

    let key = format!("{attr}=\"");
    let value_start = element.find(&key)? + key.len();
    let value_len = element[value_start..].find('"')?;
    Some(&element[value_start..value_start + value_len])
}

/// Contents of `<tag><![CDATA[...]]></tag>`.
fn cdata<'a>(frame: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}><![CDATA[");
    let close = format!("]]></{tag}>");
    let start = frame.find(&open)? + open.len();
    let len = frame[start..].rfind(&close)?;
    Some(&frame[start..start + len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_version_check() {
        let packet = decode(
            r#"<msg t="sys"><body action="verChk" r="0"><ver v="153" /></body></msg>"#,
        )
        .unwrap();
        assert_eq!(packet.namespace, SYS_NAMESPACE);
        assert_eq!(packet.command, "verChk");
        assert!(packet.args.is_empty());
    }

    #[test]
    fn test_decode_login_extracts_credentials() {
        let packet = decode(concat!(
            r#"<msg t="sys"><body action="login" r="0"><login z="w1">"#,
            "<nick><![CDATA[Cool_Guy]]></nick><pword><![CDATA[p4ss%word]]></pword>",
            "</login></body></msg>",
        ))
        .unwrap();
        assert_eq!(packet.command, "login");
        assert_eq!(packet.args, vec!["Cool_Guy".to_string(), "p4ss%word".to_string()]);
    }

    #[test]
    fn test_decode_login_without_password_keeps_nick_only() {
        let packet = decode(
            r#"<msg t="sys"><body action="login" r="0"><nick><![CDATA[solo]]></nick></body></msg>"#,
        )
        .unwrap();
        assert_eq!(packet.args, vec!["solo".to_string()]);
    }

    #[test]
    fn test_decode_without_action_is_not_a_packet() {
        assert_eq!(
            decode("<policy-file-request/>"),
            Err(ProtocolError::NotAPacket)
        );
    }

    #[test]
    fn test_random_key_reply() {
        assert_eq!(
            random_key("key"),
            r#"<msg t="sys"><body action="rndK" r="-1"><k>key</k></body></msg>"#
        );
    }
}

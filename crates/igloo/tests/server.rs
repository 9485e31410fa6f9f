//! Integration tests for the Igloo server: real sockets, full login flow,
//! rooms, chat, economy and a complete Mancala table scenario.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use igloo::config::{CatalogEntry, ListenerSettings};
use igloo::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;

const VERSION_CHECK: &str =
    r#"<msg t="sys"><body action="verChk" r="0"><ver v="153" /></body></msg>"#;
const RANDOM_KEY: &str = r#"<msg t="sys"><body action="rndK" r="-1"></body></msg>"#;
const API_OK: &str = r#"<msg t="sys"><body action="apiOK" r="0"></body></msg>"#;
const INITIAL_BOARD: &str = "4,4,4,4,4,4,0,4,4,4,4,4,4,0";

// =========================================================================
// Harness
// =========================================================================

fn test_config(engine: Engine, transport: TransportKind) -> IglooConfig {
    let mut config = IglooConfig::default();
    config.server.listeners = vec![ListenerSettings {
        bind: "127.0.0.1:0".to_string(),
        transport,
        engine,
    }];
    config.accounts.path = None;
    config.login.blocked_terms = vec!["badword".to_string()];
    config.catalog.items = vec![CatalogEntry { id: 413, cost: 100 }];
    config.catalog.furniture = vec![CatalogEntry { id: 5, cost: 50 }];
    config.catalog.furniture_limit = 1;
    config
}

async fn start_server(config: IglooConfig) -> (SocketAddr, ServerHandle) {
    let server = IglooServer::builder(config)
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addrs().expect("bound address")[0];
    let handle = server.handle();
    tokio::spawn(server.run());
    (addr, handle)
}

async fn start_engine1() -> (SocketAddr, ServerHandle) {
    start_server(test_config(Engine::Engine1, TransportKind::Tcp)).await
}

/// Creates `name` and returns a fresh session token for it.
async fn provision(handle: &ServerHandle, name: &str) -> String {
    let name = name.to_string();
    handle
        .with_world(move |world| {
            let authority = world.authority_mut();
            if !authority.account_exists(&name) {
                authority.create_account(&name, "unused");
            }
            authority
                .issue_session_token(&name)
                .expect("account exists")
                .value()
        })
        .await
}

fn login_frame(nick: &str, password: &str) -> String {
    format!(
        concat!(
            r#"<msg t="sys"><body action="login" r="0"><login z="w1">"#,
            "<nick><![CDATA[{}]]></nick><pword><![CDATA[{}]]></pword>",
            "</login></body></msg>",
        ),
        nick, password
    )
}

/// A raw TCP client speaking `\0`-terminated frames.
struct TcpClient {
    stream: TcpStream,
    buffer: Vec<u8>,
}

impl TcpClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("should connect");
        Self {
            stream,
            buffer: Vec::new(),
        }
    }

    async fn send(&mut self, frame: &str) {
        let mut bytes = frame.as_bytes().to_vec();
        bytes.push(0);
        self.stream.write_all(&bytes).await.expect("should send");
    }

    fn take_buffered(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|b| *b == 0)?;
        let frame: Vec<u8> = self.buffer.drain(..=end).collect();
        Some(String::from_utf8_lossy(&frame[..end]).into_owned())
    }

    /// Next frame, or `None` once the server closed the socket.
    async fn recv(&mut self) -> Option<String> {
        loop {
            if let Some(frame) = self.take_buffered() {
                return Some(frame);
            }
            let mut chunk = [0u8; 4096];
            let n = tokio::time::timeout(Duration::from_secs(2), self.stream.read(&mut chunk))
                .await
                .expect("timed out waiting for a frame")
                .unwrap_or(0);
            if n == 0 {
                return None;
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Reads until a frame with `code` arrives; returns it and what came
    /// before it.
    async fn collect_until(&mut self, code: &str) -> (Vec<String>, String) {
        let prefix = format!("%xt%{code}%");
        let mut skipped = Vec::new();
        loop {
            let frame = self
                .recv()
                .await
                .unwrap_or_else(|| panic!("closed while waiting for {code}"));
            if frame.starts_with(&prefix) {
                return (skipped, frame);
            }
            skipped.push(frame);
        }
    }

    async fn recv_code(&mut self, code: &str) -> String {
        self.collect_until(code).await.1
    }

    async fn expect_closed(&mut self) {
        while self.recv().await.is_some() {}
    }

    /// Handshake plus login. Returns the player id from the `l` reply.
    async fn login(&mut self, nick: &str, password: &str) -> u32 {
        self.send(VERSION_CHECK).await;
        assert_eq!(self.recv().await.as_deref(), Some(API_OK));
        self.send(RANDOM_KEY).await;
        let key = self.recv().await.expect("rndK reply");
        assert!(key.contains("<k>igloo</k>"), "unexpected rndK reply: {key}");

        self.send(&login_frame(nick, password)).await;
        let reply = self.recv_code("l").await;
        assert!(reply.ends_with("%%100,0%"), "unexpected login reply: {reply}");
        reply
            .split('%')
            .nth(4)
            .and_then(|id| id.parse().ok())
            .expect("player id in login reply")
    }

    /// Logs in and expects an error frame followed by a close.
    async fn login_rejected(&mut self, nick: &str, password: &str) -> String {
        self.send(&login_frame(nick, password)).await;
        let error = self.recv_code("e").await;
        self.expect_closed().await;
        error
    }
}

/// Connects and logs in a provisioned Engine 1 player, then joins `room`.
async fn player_in_room(addr: SocketAddr, handle: &ServerHandle, name: &str, room: u32) -> (TcpClient, u32) {
    let token = provision(handle, name).await;
    let mut client = TcpClient::connect(addr).await;
    let id = client.login(name, &token).await;
    client.send(&format!("%xt%s%jr%-1%{room}%")).await;
    client.recv_code("jr").await;
    (client, id)
}

// =========================================================================
// Login
// =========================================================================

#[tokio::test]
async fn test_login_engine1_token_is_one_shot() {
    let (addr, handle) = start_engine1().await;
    let token = provision(&handle, "Alice").await;

    let mut first = TcpClient::connect(addr).await;
    first.login("Alice", &token).await;

    let mut second = TcpClient::connect(addr).await;
    let error = second.login_rejected("Alice", &token).await;
    assert_eq!(error, "%xt%e%-1%101%");
}

#[tokio::test]
async fn test_login_engine1_unknown_account_sends_100() {
    let (addr, _handle) = start_engine1().await;
    let mut client = TcpClient::connect(addr).await;
    let error = client.login_rejected("Nobody", "token").await;
    assert_eq!(error, "%xt%e%-1%100%");
}

#[tokio::test]
async fn test_login_engine1_underscores_become_spaces() {
    let (addr, handle) = start_engine1().await;
    let token = provision(&handle, "Cool Guy").await;

    let mut client = TcpClient::connect(addr).await;
    let id = client.login("Cool_Guy", &token).await;
    client.send("%xt%s%js%-1%").await;
    client.recv_code("js").await;
    let listing = client.recv_code("jr").await;
    assert!(listing.contains(&format!("%{id}|Cool Guy|")), "listing: {listing}");
}

#[tokio::test]
async fn test_login_long_name_sends_101() {
    let (addr, _handle) = start_engine1().await;
    let mut client = TcpClient::connect(addr).await;
    let error = client.login_rejected("Abcdefghijklm", "x").await;
    assert_eq!(error, "%xt%e%-1%101%Nickname may not exceed 12 characters.%");
}

#[tokio::test]
async fn test_login_reserved_name_sends_441() {
    let (addr, _handle) = start_engine1().await;
    let mut client = TcpClient::connect(addr).await;
    let error = client.login_rejected("Rockhopper", "x").await;
    assert_eq!(error, "%xt%e%-1%441%");
}

#[tokio::test]
async fn test_login_blocked_name_escalates_ban() {
    let (addr, handle) = start_engine1().await;

    let mut client = TcpClient::connect(addr).await;
    let error = client.login_rejected("Bad_Word", "x").await;
    assert!(error.starts_with("%xt%e%-1%600%"), "unexpected: {error}");
    assert!(error.ends_with("Z%"), "expiry should be ISO-8601: {error}");

    let offenses = handle
        .with_world(|world| world.authority().account("bad word").map(|a| a.ban_offense_count))
        .await;
    assert_eq!(offenses, Some(1));
}

#[tokio::test]
async fn test_login_banned_account_sends_680() {
    let (addr, handle) = start_engine1().await;
    let token = provision(&handle, "Eve").await;
    handle
        .with_world(|world| world.authority_mut().set_ban("eve", "cheating", None))
        .await;

    let mut client = TcpClient::connect(addr).await;
    let error = client.login_rejected("Eve", &token).await;
    assert_eq!(error, "%xt%e%-1%680%cheating%");
}

#[tokio::test]
async fn test_login_bait_item_bans() {
    let (addr, handle) = start_engine1().await;
    let token = provision(&handle, "Mallory").await;
    handle
        .with_world(|world| world.authority_mut().buy_item("mallory", 130, 0))
        .await
        .expect("free item");

    let mut client = TcpClient::connect(addr).await;
    let error = client.login_rejected("Mallory", &token).await;
    assert!(error.starts_with("%xt%e%-1%600%"), "unexpected: {error}");

    let ban = handle
        .with_world(|world| world.authority().account("mallory").and_then(|a| a.ban.clone()))
        .await
        .expect("account banned");
    assert!(ban.reason.contains("130"), "{}", ban.reason);
}

#[tokio::test]
async fn test_login_engine2_creates_then_learns_alternate() {
    let (addr, _handle) = start_server(test_config(Engine::Engine2, TransportKind::Tcp)).await;

    let mut first = TcpClient::connect(addr).await;
    let id = first.login("Walker", "primary").await;

    let mut second = TcpClient::connect(addr).await;
    assert_eq!(second.login("Walker", "hashed").await, id);

    let mut third = TcpClient::connect(addr).await;
    let error = third.login_rejected("Walker", "other").await;
    assert_eq!(error, "%xt%e%-1%101%");
}

#[tokio::test]
async fn test_login_engine3_wrong_password_sends_101() {
    let (addr, _handle) = start_server(test_config(Engine::Engine3, TransportKind::Tcp)).await;

    let mut first = TcpClient::connect(addr).await;
    first.login("Strict", "primary").await;

    let mut second = TcpClient::connect(addr).await;
    let error = second.login_rejected("Strict", "hashed").await;
    assert_eq!(error, "%xt%e%-1%101%");
}

#[tokio::test]
async fn test_packets_before_login_are_ignored() {
    let (addr, _handle) = start_engine1().await;
    let mut client = TcpClient::connect(addr).await;

    client.send("%xt%s%jr%-1%100%").await;
    client.send("GET / HTTP/1.1").await;
    client.send(VERSION_CHECK).await;
    assert_eq!(client.recv().await.as_deref(), Some(API_OK));
}

#[tokio::test]
async fn test_chat_filter_ignores_anonymous_connections() {
    let (addr, _handle) = start_engine1().await;
    let mut client = TcpClient::connect(addr).await;

    client.send("%xt%s%sm%-1%1%call me 555 123 4567%").await;
    client.send(VERSION_CHECK).await;
    assert_eq!(client.recv().await.as_deref(), Some(API_OK));
}

#[tokio::test]
async fn test_inventory_requested_before_login_still_answers_after() {
    let (addr, handle) = start_engine1().await;
    let token = provision(&handle, "Alice").await;
    let mut client = TcpClient::connect(addr).await;

    client.send("%xt%s%gi%-1%").await;
    client.login("Alice", &token).await;
    client.send("%xt%s%gi%-1%").await;
    assert_eq!(client.recv_code("gi").await, "%xt%gi%-1%");
}

// =========================================================================
// Rooms and chat
// =========================================================================

#[tokio::test]
async fn test_chat_broadcast_and_personal_info_filter() {
    let (addr, handle) = start_engine1().await;
    let (mut alice, alice_id) = player_in_room(addr, &handle, "Alice", 100).await;
    let (mut bob, _) = player_in_room(addr, &handle, "Bob", 100).await;

    alice.send(&format!("%xt%s%sm%-1%{alice_id}%call me 555 123 4567%")).await;
    assert_eq!(alice.recv_code("e").await, "%xt%e%-1%913%");

    alice.send(&format!("%xt%s%sm%-1%{alice_id}%hello%")).await;
    let message = bob.recv_code("sm").await;
    assert_eq!(message, format!("%xt%sm%-1%{alice_id}%hello%"));
}

#[tokio::test]
async fn test_moderator_ban_disconnects_target() {
    let (addr, handle) = start_engine1().await;
    let (mut alice, alice_id) = player_in_room(addr, &handle, "Alice", 100).await;
    let (mut bob, bob_id) = player_in_room(addr, &handle, "Bob", 100).await;

    bob.send(&format!("%xt%s%sm%-1%{bob_id}%!ban Alice%")).await;
    assert_eq!(bob.recv_code("e").await, "%xt%e%-1%610%");

    handle
        .with_world(|world| world.authority_mut().set_moderator("alice", true))
        .await;
    alice.send(&format!("%xt%s%sm%-1%{alice_id}%!ban Bob%")).await;

    assert_eq!(bob.recv_code("e").await, "%xt%e%-1%680%Banned by moderator%");
    bob.expect_closed().await;

    let (left, _) = alice.collect_until("rp").await;
    assert!(left.iter().all(|f| !f.starts_with("%xt%sm%")), "command leaked: {left:?}");
}

#[tokio::test]
async fn test_position_and_teleport_broadcast() {
    let (addr, handle) = start_engine1().await;
    let (mut alice, alice_id) = player_in_room(addr, &handle, "Alice", 111).await;
    let (mut bob, _) = player_in_room(addr, &handle, "Bob", 111).await;

    alice.send("%xt%s%sp%-1%120%340%").await;
    assert_eq!(bob.recv_code("sp").await, format!("%xt%sp%-1%{alice_id}%120%340%"));

    alice.send("%xt%s%st%-1%200%x%18%").await;
    alice.send("%xt%s%st%-1%200%210%18%").await;
    assert_eq!(bob.recv_code("st").await, format!("%xt%st%-1%{alice_id}%200%210%18%"));
}

// =========================================================================
// Economy
// =========================================================================

#[tokio::test]
async fn test_buying_items_and_furniture() {
    let (addr, handle) = start_engine1().await;
    let (mut alice, _) = player_in_room(addr, &handle, "Alice", 100).await;

    alice.send("%xt%s%ai%-1%413%").await;
    assert_eq!(alice.recv_code("ai").await, "%xt%ai%-1%413%400%");

    alice.send("%xt%s%ai%-1%999%").await;
    assert_eq!(alice.recv_code("e").await, "%xt%e%-1%402%");

    alice.send("%xt%s%af%-1%5%").await;
    assert_eq!(alice.recv_code("af").await, "%xt%af%-1%5%350%");

    alice.send("%xt%s%af%-1%5%").await;
    assert_eq!(alice.recv_code("e").await, "%xt%e%-1%450%");

    alice.send("%xt%s%gi%-1%").await;
    assert_eq!(alice.recv_code("gi").await, "%xt%gi%-1%413%");

    // Inventory is sent once per connection.
    alice.send("%xt%s%gi%-1%").await;
    alice.send("%xt%s%gc%-1%").await;
    let (skipped, coins) = alice.collect_until("gc").await;
    assert_eq!(coins, "%xt%gc%-1%350%");
    assert!(skipped.iter().all(|f| !f.starts_with("%xt%gi%")));
}

// =========================================================================
// Mancala
// =========================================================================

#[tokio::test]
async fn test_mancala_two_players_out_of_turn_move_ignored() {
    let (addr, handle) = start_engine1().await;
    let (mut alice, _) = player_in_room(addr, &handle, "Alice", 111).await;
    let (mut bob, _) = player_in_room(addr, &handle, "Bob", 111).await;

    alice.send("%xt%s%gt%-1%").await;
    assert_eq!(
        alice.recv_code("gt").await,
        "%xt%gt%-1%100|0%101|0%102|0%103|0%104|0%"
    );

    alice.send("%xt%s%jt%-1%100%").await;
    assert_eq!(alice.recv_code("jt").await, "%xt%jt%-1%100%0%");
    alice.send("%xt%z%jz%-1%").await;
    assert_eq!(alice.recv_code("jz").await, "%xt%jz%-1%0%");

    bob.send("%xt%s%jt%-1%100%").await;
    assert_eq!(bob.recv_code("jt").await, "%xt%jt%-1%100%1%");
    bob.send("%xt%z%jz%-1%").await;
    assert_eq!(bob.recv_code("jz").await, "%xt%jz%-1%1%");

    let start = bob.recv_code("sz").await;
    assert_eq!(alice.recv_code("sz").await, start);
    let turn: usize = match start.as_str() {
        "%xt%sz%-1%0%" => 0,
        "%xt%sz%-1%1%" => 1,
        other => panic!("unexpected start frame {other}"),
    };

    let (mover, waiter) = if turn == 0 {
        (&mut alice, &mut bob)
    } else {
        (&mut bob, &mut alice)
    };
    let mover_pit = if turn == 0 { 0 } else { 7 };
    let waiter_pit = if turn == 0 { 7 } else { 0 };

    // Out of turn: nothing happens.
    waiter.send(&format!("%xt%z%zm%-1%{waiter_pit}%")).await;
    waiter.send("%xt%z%gz%-1%").await;
    let (skipped, snapshot) = waiter.collect_until("gz").await;
    assert!(skipped.iter().all(|f| !f.starts_with("%xt%zm%")), "{skipped:?}");
    assert_eq!(snapshot, format!("%xt%gz%-1%Alice%Bob%{INITIAL_BOARD}%{turn}%"));

    // In turn: both players see the move.
    mover.send(&format!("%xt%z%zm%-1%{mover_pit}%")).await;
    let expected = format!("%xt%zm%-1%{turn}%{mover_pit}%%");
    assert_eq!(mover.recv_code("zm").await, expected);
    assert_eq!(waiter.recv_code("zm").await, expected);
}

#[tokio::test]
async fn test_disconnect_releases_seat_and_room() {
    let (addr, handle) = start_engine1().await;
    let (mut bob, _) = player_in_room(addr, &handle, "Bob", 111).await;
    let (mut alice, alice_id) = player_in_room(addr, &handle, "Alice", 111).await;

    alice.send("%xt%s%jt%-1%101%").await;
    alice.recv_code("jt").await;
    assert_eq!(bob.recv_code("ut").await, "%xt%ut%-1%101%1%");

    drop(alice);

    let (skipped, removed) = bob.collect_until("rp").await;
    assert_eq!(removed, format!("%xt%rp%-1%{alice_id}%"));
    assert!(skipped.contains(&"%xt%ut%-1%101%0%".to_string()), "{skipped:?}");

    let online = handle.with_world(|world| world.online()).await;
    assert_eq!(online, 1);
}

// =========================================================================
// WebSocket
// =========================================================================

#[tokio::test]
async fn test_websocket_listener_speaks_same_protocol() {
    let (addr, _handle) =
        start_server(test_config(Engine::Engine1, TransportKind::WebSocket)).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");

    ws.send(Message::Text(VERSION_CHECK.into()))
        .await
        .expect("should send");

    let reply = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out")
        .expect("stream ended")
        .expect("ws error");
    assert_eq!(reply.to_text().expect("text frame"), format!("{API_OK}\0"));
}

//! Session tokens and authority configuration.
//!
//! Token-authenticated clients (Engine 1) never send their password to the
//! game socket. A separate login step issues a [`SessionToken`]; the client
//! then presents `smart_key + login_key` as its "password" and the server
//! accepts it exactly once.

use rand::Rng;

const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

// ---------------------------------------------------------------------------
// AuthorityConfig
// ---------------------------------------------------------------------------

/// Configuration for the session authority.
#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    /// Coins credited to freshly created accounts.
    pub starting_coins: u32,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self { starting_coins: 500 }
    }
}

// ---------------------------------------------------------------------------
// SessionToken
// ---------------------------------------------------------------------------

/// A freshly issued login token.
///
/// The client concatenates `smart_key` and `login_key` into the value it
/// presents; `crumb_key` is handed to the client's web login page and never
/// checked by the game server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub smart_key: String,
    pub login_key: String,
    pub crumb_key: String,
}

impl SessionToken {
    /// Generates a token with the standard key lengths (10, 6, 8).
    pub fn generate() -> Self {
        Self {
            smart_key: random_key(10),
            login_key: random_key(6),
            crumb_key: random_key(8),
        }
    }

    /// The value the client must present at login.
    pub fn value(&self) -> String {
        format!("{}{}", self.smart_key, self.login_key)
    }
}

/// A random lowercase alphanumeric string of `len` characters.
pub fn random_key(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..TOKEN_ALPHABET.len());
            TOKEN_ALPHABET[idx] as char
        })
        .collect()
}

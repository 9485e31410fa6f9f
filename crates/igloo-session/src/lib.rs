//! Accounts, credentials, bans and session tokens for Igloo.
//!
//! This crate is the server's single source of truth about players:
//!
//! 1. **Accounts**: persistent records keyed by lowercase username
//!    ([`Account`], stored by [`AccountStore`] as one JSON document)
//! 2. **Credentials**: password-on-first-use with the
//!    [`CredentialVariant`] alternate-password policy
//! 3. **Bans**: lazily expiring bans and the escalation ladder
//!    ([`BanStatus`], [`BanOutcome`])
//! 4. **Session tokens**: one-shot tokens for token-authenticated
//!    clients ([`SessionToken`])
//! 5. **Name rules**: length limit, reserved and blocked names
//!    ([`NameRules`])
//!
//! [`SessionAuthority`] ties these together.
//!
//! # How it fits in the stack
//!
//! ```text
//! Login handler (above)  ← asks "may this name log in, and as whom?"
//!     ↕
//! Session Layer (this crate)  ← accounts, bans, tokens, wallet
//!     ↕
//! accounts.json  ← persisted after every mutation
//! ```

mod account;
mod auth;
mod authority;
pub mod ban;
mod error;
mod names;
mod session;
mod store;

pub use account::{Account, BanRecord};
pub use auth::CredentialVariant;
pub use authority::SessionAuthority;
pub use ban::{BanKind, BanOutcome, BanStatus};
pub use error::SessionError;
pub use names::{NameRules, MASCOT_NAMES, STAFF_NAMES};
pub use session::{random_key, AuthorityConfig, SessionToken};
pub use store::AccountStore;

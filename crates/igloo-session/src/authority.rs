//! The session authority: every account, credential, ban and token
//! decision goes through here.
//!
//! # Concurrency note
//!
//! `SessionAuthority` is NOT thread-safe by itself; it is a plain map plus
//! a file path. The server owns exactly one, inside the world state that
//! sits behind a single mutex, so a login's "check ban, then act" sequence
//! can never interleave with another login.
//!
//! All usernames are matched case-insensitively: every public method
//! lowercases its `username` before touching the store.

use chrono::{DateTime, Utc};
use igloo_protocol::PlayerId;

use crate::auth::{self, CredentialCheck};
use crate::ban::{self, BanKind, BanOutcome, BanStatus};
use crate::{
    Account, AccountStore, AuthorityConfig, BanRecord, CredentialVariant,
    SessionError, SessionToken,
};

fn key(username: &str) -> String {
    username.to_lowercase()
}

/// Owns the account store and applies the account rules.
#[derive(Debug)]
pub struct SessionAuthority {
    store: AccountStore,
    config: AuthorityConfig,
}

impl SessionAuthority {
    /// Creates an authority over an already loaded store.
    pub fn new(store: AccountStore, config: AuthorityConfig) -> Self {
        Self { store, config }
    }

    /// An authority with no backing file.
    pub fn in_memory() -> Self {
        Self::new(AccountStore::in_memory(), AuthorityConfig::default())
    }

    pub fn account_exists(&self, username: &str) -> bool {
        self.store.contains(&key(username))
    }

    pub fn account(&self, username: &str) -> Option<&Account> {
        self.store.get(&key(username))
    }

    /// The persistent id of `username`, if the account exists.
    pub fn player_id(&self, username: &str) -> Option<PlayerId> {
        self.account(username).map(Account::player_id)
    }

    // -----------------------------------------------------------------------
    // Credentials
    // -----------------------------------------------------------------------

    /// `true` if `password` matches the primary or stored alternate
    /// password. Unknown users never verify.
    pub fn verify_credentials(&self, username: &str, password: &str) -> bool {
        match self.account(username) {
            Some(account) => auth::matches(account, password),
            None => false,
        }
    }

    /// Like [`verify_credentials`](Self::verify_credentials), applying the
    /// alternate-password policy of `variant`. A learned alternate is
    /// persisted immediately.
    pub fn verify_with_variant(
        &mut self,
        username: &str,
        password: &str,
        variant: CredentialVariant,
    ) -> bool {
        let name = key(username);
        let Some(account) = self.store.get_mut(&name) else {
            return false;
        };
        match auth::check(account, password, variant) {
            CredentialCheck::Accepted => true,
            CredentialCheck::Learned => {
                tracing::info!(username = %name, "stored alternate password");
                self.store.persist();
                true
            }
            CredentialCheck::Rejected => {
                tracing::debug!(username = %name, "password mismatch");
                false
            }
        }
    }

    /// Inserts a fresh account, replacing any existing record. Callers
    /// check [`account_exists`](Self::account_exists) first.
    pub fn create_account(&mut self, username: &str, password: &str) -> PlayerId {
        let name = key(username);
        let id = self.store.next_id();
        self.store.insert(
            name.clone(),
            Account::new(id, password, self.config.starting_coins),
        );
        self.store.persist();
        tracing::info!(username = %name, id, "created account");
        PlayerId(id)
    }

    // -----------------------------------------------------------------------
    // Bans
    // -----------------------------------------------------------------------

    /// The active ban on `username`, if any. Clears an expired ban as a
    /// side effect.
    pub fn check_ban_status(&mut self, username: &str) -> Option<BanStatus> {
        self.check_ban_status_at(username, Utc::now())
    }

    /// [`check_ban_status`](Self::check_ban_status) against an explicit
    /// clock.
    pub fn check_ban_status_at(
        &mut self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Option<BanStatus> {
        let name = key(username);
        let account = self.store.get_mut(&name)?;
        let record = account.ban.as_ref()?;

        if !record.is_active(now) {
            account.ban = None;
            tracing::info!(username = %name, "ban expired, cleared");
            self.store.persist();
            return None;
        }
        Some(ban::describe(&record.reason, record.expires_at))
    }

    /// Records one more offense for `username` and bans them for the
    /// matching ladder step. Creates the account (with an empty password)
    /// if it does not exist yet.
    pub fn issue_escalating_ban(&mut self, username: &str, reason: &str) -> BanOutcome {
        self.issue_escalating_ban_at(username, reason, Utc::now())
    }

    /// [`issue_escalating_ban`](Self::issue_escalating_ban) against an
    /// explicit clock.
    pub fn issue_escalating_ban_at(
        &mut self,
        username: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> BanOutcome {
        let name = key(username);
        let starting_coins = self.config.starting_coins;
        let account = self
            .store
            .get_or_create(&name, |id| Account::new(id, "", starting_coins));

        account.ban_offense_count += 1;
        let offenses = account.ban_offense_count;
        let expires_at = ban::ladder_duration(offenses).map(|d| now + d);
        account.ban = Some(BanRecord {
            reason: reason.to_string(),
            expires_at,
        });
        self.store.persist();

        let kind = if expires_at.is_some() {
            BanKind::Temporary
        } else {
            BanKind::Permanent
        };
        tracing::warn!(
            username = %name,
            offenses,
            ?kind,
            reason,
            "issued escalating ban"
        );
        BanOutcome { kind, expires_at }
    }

    /// Sets a ban directly, without touching the offense count. Returns
    /// `false` if the account does not exist.
    pub fn set_ban(
        &mut self,
        username: &str,
        reason: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> bool {
        let Some(account) = self.store.get_mut(&key(username)) else {
            return false;
        };
        account.ban = Some(BanRecord {
            reason: reason.to_string(),
            expires_at,
        });
        self.store.persist();
        true
    }

    /// Lifts any ban. Returns `false` if there was nothing to lift.
    pub fn clear_ban(&mut self, username: &str) -> bool {
        let Some(account) = self.store.get_mut(&key(username)) else {
            return false;
        };
        if account.ban.take().is_none() {
            return false;
        }
        self.store.persist();
        true
    }

    /// Whether `username` may run privileged commands.
    pub fn is_moderator(&self, username: &str) -> bool {
        self.account(username).is_some_and(|a| a.moderator)
    }

    /// Grants or revokes moderator rights.
    pub fn set_moderator(&mut self, username: &str, moderator: bool) -> bool {
        let Some(account) = self.store.get_mut(&key(username)) else {
            return false;
        };
        account.moderator = moderator;
        self.store.persist();
        true
    }

    // -----------------------------------------------------------------------
    // Session tokens
    // -----------------------------------------------------------------------

    /// Issues a one-shot login token for an existing account, replacing
    /// any token still pending.
    ///
    /// # Errors
    /// [`SessionError::UnknownAccount`] if the account does not exist.
    pub fn issue_session_token(
        &mut self,
        username: &str,
    ) -> Result<SessionToken, SessionError> {
        let name = key(username);
        let account = self
            .store
            .get_mut(&name)
            .ok_or_else(|| SessionError::UnknownAccount(name.clone()))?;
        let token = SessionToken::generate();
        account.session_token = Some(token.value());
        self.store.persist();
        tracing::debug!(username = %name, "issued session token");
        Ok(token)
    }

    /// `true` exactly once for the pending token; the token is consumed on
    /// a match and kept on a mismatch.
    pub fn validate_and_consume_token(&mut self, username: &str, token: &str) -> bool {
        let name = key(username);
        let Some(account) = self.store.get_mut(&name) else {
            return false;
        };
        match account.session_token.as_deref() {
            Some(expected) if expected == token => {
                account.session_token = None;
                self.store.persist();
                true
            }
            Some(_) => {
                tracing::debug!(username = %name, "session token mismatch");
                false
            }
            None => {
                tracing::debug!(username = %name, "no pending session token");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Wallet and inventory
    // -----------------------------------------------------------------------

    pub fn coins(&self, username: &str) -> u32 {
        self.account(username).map_or(0, |a| a.coins)
    }

    /// Credits coins and returns the new balance.
    pub fn add_coins(&mut self, username: &str, amount: u32) -> Option<u32> {
        let account = self.store.get_mut(&key(username))?;
        account.coins = account.coins.saturating_add(amount);
        let balance = account.coins;
        self.store.persist();
        Some(balance)
    }

    pub fn items(&self, username: &str) -> &[u32] {
        self.account(username)
            .map(|a| a.items.as_slice())
            .unwrap_or_default()
    }

    pub fn furniture(&self, username: &str) -> &[u32] {
        self.account(username)
            .map(|a| a.furniture.as_slice())
            .unwrap_or_default()
    }

    /// Debits `price` and adds `item` to the inventory. Owning the item
    /// already is not an error and costs nothing. Returns the new balance.
    ///
    /// # Errors
    /// [`SessionError::UnknownAccount`] or
    /// [`SessionError::InsufficientCoins`]; nothing changes on error.
    pub fn buy_item(
        &mut self,
        username: &str,
        item: u32,
        price: u32,
    ) -> Result<u32, SessionError> {
        let name = key(username);
        let account = self
            .store
            .get_mut(&name)
            .ok_or_else(|| SessionError::UnknownAccount(name.clone()))?;
        if account.items.contains(&item) {
            return Ok(account.coins);
        }
        if account.coins < price {
            return Err(SessionError::InsufficientCoins {
                have: account.coins,
                need: price,
            });
        }
        account.coins -= price;
        account.items.push(item);
        let balance = account.coins;
        self.store.persist();
        tracing::debug!(username = %name, item, price, "bought item");
        Ok(balance)
    }

    /// Debits `price` and adds one piece of `furniture`, as long as the
    /// account holds fewer than `limit` pieces. Returns the new balance.
    ///
    /// # Errors
    /// [`SessionError::UnknownAccount`],
    /// [`SessionError::InsufficientCoins`] or
    /// [`SessionError::FurnitureLimit`]; nothing changes on error.
    pub fn buy_furniture(
        &mut self,
        username: &str,
        furniture: u32,
        price: u32,
        limit: usize,
    ) -> Result<u32, SessionError> {
        let name = key(username);
        let account = self
            .store
            .get_mut(&name)
            .ok_or_else(|| SessionError::UnknownAccount(name.clone()))?;
        if account.coins < price {
            return Err(SessionError::InsufficientCoins {
                have: account.coins,
                need: price,
            });
        }
        if account.furniture.len() >= limit {
            return Err(SessionError::FurnitureLimit(limit));
        }
        account.coins -= price;
        account.furniture.push(furniture);
        let balance = account.coins;
        self.store.persist();
        tracing::debug!(username = %name, furniture, price, "bought furniture");
        Ok(balance)
    }
}

//! Account records: the persistent per-player data.
//!
//! One [`Account`] per lowercase username. Accounts are created on first
//! login (password-on-first-use) or by an automatic ban, and are never
//! deleted. The serialized field names follow the accounts file format
//! (`camelCase`), with aliases for the names older files used.

use chrono::{DateTime, Utc};
use igloo_protocol::PlayerId;
use serde::{Deserialize, Serialize};

/// An active or expired ban on an account.
///
/// `expires_at == None` is permanent. A ban whose expiry has passed is
/// inactive and gets cleared the next time the account's ban status is
/// checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanRecord {
    /// Human-readable reason, shown to the player.
    #[serde(default)]
    pub reason: String,
    /// When the ban lifts; `None` for permanent bans.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl BanRecord {
    /// Returns `true` if the ban still applies at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => expires_at > now,
        }
    }
}

/// A persistent player account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Numeric player id. Files written before ids existed load as 0 and
    /// are renumbered by the store.
    #[serde(default)]
    pub id: u32,

    /// Primary password, compared verbatim (case-sensitive).
    #[serde(default)]
    pub password: String,

    /// Second accepted password for clients that transmit it differently.
    /// See [`CredentialVariant`](crate::CredentialVariant).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_password: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ban: Option<BanRecord>,

    /// How many bans this account has received. Drives the ban ladder and
    /// never decreases.
    #[serde(default, alias = "banOffenses")]
    pub ban_offense_count: u32,

    /// Pending one-shot token for token-authenticated (Engine 1) logins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,

    /// May run privileged chat commands.
    #[serde(default, alias = "godMode")]
    pub moderator: bool,

    #[serde(default)]
    pub coins: u32,

    /// Owned clothing item ids.
    #[serde(default)]
    pub items: Vec<u32>,

    /// Owned furniture ids; duplicates allowed.
    #[serde(default)]
    pub furniture: Vec<u32>,
}

impl Account {
    /// A fresh account with the given password and starting balance.
    pub fn new(id: u32, password: &str, coins: u32) -> Self {
        Self {
            id,
            password: password.to_string(),
            alternate_password: None,
            created_at: Utc::now(),
            ban: None,
            ban_offense_count: 0,
            session_token: None,
            moderator: false,
            coins,
            items: Vec::new(),
            furniture: Vec::new(),
        }
    }

    /// The account's id as a protocol [`PlayerId`].
    pub fn player_id(&self) -> PlayerId {
        PlayerId(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_ban_record_is_active() {
        let now = Utc::now();
        let permanent = BanRecord {
            reason: "x".into(),
            expires_at: None,
        };
        let future = BanRecord {
            reason: "x".into(),
            expires_at: Some(now + Duration::hours(1)),
        };
        let past = BanRecord {
            reason: "x".into(),
            expires_at: Some(now - Duration::seconds(1)),
        };
        assert!(permanent.is_active(now));
        assert!(future.is_active(now));
        assert!(!past.is_active(now));
    }

    #[test]
    fn test_account_deserializes_legacy_fields() {
        let json = r#"{
            "password": "hunter2",
            "createdAt": "2024-01-02T03:04:05.000Z",
            "banOffenses": 2,
            "godMode": true
        }"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.password, "hunter2");
        assert_eq!(account.ban_offense_count, 2);
        assert!(account.moderator);
        assert_eq!(account.id, 0);
        assert!(account.ban.is_none());
        assert_eq!(account.coins, 0);
    }

    #[test]
    fn test_account_serializes_camel_case() {
        let mut account = Account::new(101, "pw", 500);
        account.ban = Some(BanRecord {
            reason: "spam".into(),
            expires_at: None,
        });
        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value["banOffenseCount"], 0);
        assert_eq!(value["ban"]["expiresAt"], serde_json::Value::Null);
        assert!(value.get("sessionToken").is_none());
        assert!(value.get("alternatePassword").is_none());
    }
}

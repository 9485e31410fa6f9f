//! JSON-file persistence for accounts.
//!
//! The whole account map is one JSON object keyed by lowercase username.
//! It is loaded once at startup and rewritten after every mutation. A
//! missing or unreadable file means "no accounts yet", never a startup
//! failure.
//!
//! Records are read one at a time. A record with an unusable field is
//! repaired where the intent is clear (an unparseable ban expiry counts as
//! a permanent ban) and skipped otherwise. Whenever anything was dropped,
//! the file is copied to `<name>.bak` before it can be overwritten.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::{Account, SessionError};

/// First id handed out when the store is empty.
const FIRST_PLAYER_ID: u32 = 101;

/// The in-memory account map plus where (if anywhere) it is persisted.
#[derive(Debug, Default)]
pub struct AccountStore {
    path: Option<PathBuf>,
    accounts: BTreeMap<String, Account>,
}

impl AccountStore {
    /// A store that never touches disk. Used by tests and dry runs.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the store from `path`.
    ///
    /// A missing file yields an empty store. A file that is not a JSON
    /// object is logged, backed up and also yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let accounts = match read_accounts(&path) {
            Ok(loaded) => {
                tracing::info!(
                    path = %path.display(),
                    count = loaded.accounts.len(),
                    skipped = loaded.skipped,
                    "loaded accounts"
                );
                if loaded.skipped > 0 {
                    back_up(&path);
                }
                loaded.accounts
            }
            Err(SessionError::Io(e))
                if e.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::info!(
                    path = %path.display(),
                    "no accounts file yet, starting empty"
                );
                BTreeMap::new()
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "accounts file unusable, starting empty"
                );
                back_up(&path);
                BTreeMap::new()
            }
        };

        let mut store = Self {
            path: Some(path),
            accounts,
        };
        store.assign_missing_ids();
        store
    }

    /// Where the store is persisted, if anywhere.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Account> {
        self.accounts.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Account> {
        self.accounts.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.accounts.contains_key(key)
    }

    /// Inserts or replaces an account.
    pub fn insert(&mut self, key: String, account: Account) {
        self.accounts.insert(key, account);
    }

    /// The account under `key`, inserting `create(next_id)` if missing.
    pub fn get_or_create(
        &mut self,
        key: &str,
        create: impl FnOnce(u32) -> Account,
    ) -> &mut Account {
        let id = self.next_id();
        self.accounts
            .entry(key.to_string())
            .or_insert_with(|| create(id))
    }

    /// The id the next created account should get.
    pub fn next_id(&self) -> u32 {
        self.accounts
            .values()
            .map(|a| a.id)
            .max()
            .map_or(FIRST_PLAYER_ID, |max| (max + 1).max(FIRST_PLAYER_ID))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Writes the whole map to disk: temp file, then rename over the
    /// original.
    ///
    /// # Errors
    /// I/O or serialization failures. In-memory stores always succeed.
    pub fn save(&self) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.accounts)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Saves and logs any failure. Memory stays authoritative either way.
    pub fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::error!(error = %e, "failed to save accounts");
        }
    }

    fn assign_missing_ids(&mut self) {
        let mut next = self.next_id();
        for account in self.accounts.values_mut() {
            if account.id == 0 {
                account.id = next;
                next += 1;
            }
        }
    }
}

/// What a load recovered.
struct Loaded {
    accounts: BTreeMap<String, Account>,
    /// Records that could not be used at all.
    skipped: usize,
}

fn read_accounts(path: &Path) -> Result<Loaded, SessionError> {
    let raw = std::fs::read_to_string(path)?;
    let parsed: BTreeMap<String, Value> = serde_json::from_str(&raw)?;

    let mut loaded = Loaded {
        accounts: BTreeMap::new(),
        skipped: 0,
    };
    for (name, mut record) in parsed {
        if let Value::Object(fields) = &mut record {
            repair_record(&name, fields);
        }
        match serde_json::from_value::<Account>(record) {
            // Keys are matched lowercase; normalize whatever an editor left behind.
            Ok(account) => {
                loaded.accounts.insert(name.to_lowercase(), account);
            }
            Err(e) => {
                tracing::warn!(username = %name, error = %e, "skipping unreadable account");
                loaded.skipped += 1;
            }
        }
    }
    Ok(loaded)
}

/// Brings an older or hand-edited record into the current shape.
fn repair_record(name: &str, fields: &mut Map<String, Value>) {
    // Older files kept `alternatePasswords` as a string or a list.
    if let Some(legacy) = fields.remove("alternatePasswords") {
        let first = match legacy {
            Value::String(s) => Some(s),
            Value::Array(values) => values.into_iter().find_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            }),
            _ => None,
        };
        if let Some(alternate) = first {
            fields.insert("alternatePassword".to_string(), Value::String(alternate));
        }
    }
    if fields
        .get("alternatePassword")
        .is_some_and(|v| !v.is_string())
    {
        fields.remove("alternatePassword");
    }

    // A ban whose expiry can't be read stays in force, permanently.
    if let Some(Value::Object(ban)) = fields.get_mut("ban") {
        let readable = match ban.get("expiresAt") {
            None | Some(Value::Null) => true,
            Some(Value::String(at)) => at.parse::<DateTime<Utc>>().is_ok(),
            Some(_) => false,
        };
        if !readable {
            tracing::warn!(username = %name, "unreadable ban expiry, treating ban as permanent");
            ban.insert("expiresAt".to_string(), Value::Null);
        }
        if ban.get("reason").is_some_and(|r| !r.is_string()) {
            ban.remove("reason");
        }
    }
}

/// Copies `path` to `<path>.bak` so a lossy load never destroys data.
fn back_up(path: &Path) {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".bak");
    match std::fs::copy(path, &backup) {
        Ok(_) => tracing::warn!(
            backup = %Path::new(&backup).display(),
            "kept a copy of the accounts file"
        ),
        Err(e) => tracing::error!(error = %e, "failed to back up accounts file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::load(dir.path().join("accounts.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = AccountStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut store = AccountStore::load(&path);
        store.insert("carol".into(), Account::new(101, "pw", 500));
        store.persist();

        let backup = dir.path().join("accounts.json.bak");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "{ not json");
    }

    #[test]
    fn test_load_bad_record_keeps_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(
            &path,
            r#"{
                "alice": {"id": 101, "password": "a", "coins": 900},
                "bob": {"id": 102, "password": "b", "ban": {"reason": "x", "expiresAt": "soon"}},
                "dave": {"id": 103, "password": "d", "coins": null}
            }"#,
        )
        .unwrap();

        let mut store = AccountStore::load(&path);
        assert_eq!(store.get("alice").unwrap().coins, 900);
        let bob_ban = store.get("bob").unwrap().ban.clone().unwrap();
        assert_eq!(bob_ban.reason, "x");
        assert_eq!(bob_ban.expires_at, None);
        assert!(store.get("dave").is_none());

        store.insert("carol".into(), Account::new(104, "pw", 500));
        store.persist();

        let reloaded = AccountStore::load(&path);
        assert_eq!(reloaded.get("alice").unwrap().coins, 900);
        assert!(reloaded.contains("bob"));
        assert!(reloaded.contains("carol"));
        assert!(dir.path().join("accounts.json.bak").exists());
    }

    #[test]
    fn test_load_migrates_alternate_password_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(
            &path,
            r#"{
                "erin": {"password": "a", "alternatePasswords": [7, "legacy", "later"]},
                "finn": {"password": "b", "alternatePasswords": "single"},
                "gail": {"password": "c", "alternatePassword": 42}
            }"#,
        )
        .unwrap();

        let store = AccountStore::load(&path);
        assert_eq!(store.get("erin").unwrap().alternate_password.as_deref(), Some("legacy"));
        assert_eq!(store.get("finn").unwrap().alternate_password.as_deref(), Some("single"));
        assert_eq!(store.get("gail").unwrap().alternate_password, None);
        assert!(!dir.path().join("accounts.json.bak").exists());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("accounts.json");

        let mut store = AccountStore::load(&path);
        let id = store.next_id();
        store.insert("alice".into(), Account::new(id, "pw", 500));
        store.save().unwrap();

        let reloaded = AccountStore::load(&path);
        let alice = reloaded.get("alice").unwrap();
        assert_eq!(alice.id, FIRST_PLAYER_ID);
        assert_eq!(alice.password, "pw");
        assert_eq!(alice.coins, 500);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_assigns_ids_and_lowercases_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(
            &path,
            r#"{"Bob": {"password": "a"}, "carol": {"password": "b", "id": 200}}"#,
        )
        .unwrap();

        let store = AccountStore::load(&path);
        assert_eq!(store.get("bob").unwrap().id, 201);
        assert_eq!(store.get("carol").unwrap().id, 200);
        assert_eq!(store.next_id(), 202);
    }

    #[test]
    fn test_in_memory_save_is_noop() {
        let store = AccountStore::in_memory();
        assert!(store.save().is_ok());
        assert!(store.path().is_none());
    }
}

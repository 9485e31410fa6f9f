//! Server configuration.
//!
//! Everything is loaded from one TOML file. Every section and every field
//! has a default, so an empty file (or no file at all) yields a working
//! single-listener server with the standard table layout. An explicit
//! `tables = []` runs without tables.
//!
//! ```toml
//! [[server.listeners]]
//! bind = "0.0.0.0:6112"
//! transport = "tcp"
//! engine = "engine1"
//!
//! [accounts]
//! path = "data/accounts.json"
//!
//! [[tables]]
//! room = 111
//! first_id = 100
//! count = 5
//! ```

use std::path::{Path, PathBuf};

use igloo_session::{AuthorityConfig, NameRules};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// Application configuration loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IglooConfig {
    pub server: ServerSettings,
    pub accounts: AccountSettings,
    pub login: LoginSettings,
    /// Worlds advertised in the login reply.
    pub worlds: Vec<WorldSettings>,
    /// Tables wired into rooms at boot.
    pub tables: Vec<TableSettings>,
    pub catalog: CatalogSettings,
    pub logging: LoggingSettings,
}

impl IglooConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: IglooConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`. A missing file yields the defaults.
    pub async fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&content)
    }

    /// Rejects configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listeners.is_empty() {
            return Err(ConfigError::Invalid("no listeners configured".into()));
        }
        for table in &self.tables {
            if table.game != "mancala" {
                return Err(ConfigError::Invalid(format!(
                    "unknown table game {:?} in room {}",
                    table.game, table.room
                )));
            }
        }
        Ok(())
    }

    /// Session authority settings derived from this config.
    pub fn authority_config(&self) -> AuthorityConfig {
        AuthorityConfig {
            starting_coins: self.accounts.starting_coins,
        }
    }

    /// Nickname rules derived from this config.
    pub fn name_rules(&self) -> NameRules {
        let mut rules = NameRules {
            max_len: self.login.max_name_len,
            ..NameRules::default()
        };
        rules
            .reserved
            .extend(self.login.reserved_names.iter().map(|n| n.to_lowercase()));
        rules.blocked_terms = self
            .login
            .blocked_terms
            .iter()
            .map(|t| t.to_lowercase())
            .collect();
        rules
    }

    /// The `worlds` field of the login reply: `id,population|id,population`.
    pub fn world_list(&self) -> String {
        self.worlds
            .iter()
            .map(|w| format!("{},{}", w.id, w.population))
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl Default for IglooConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            accounts: AccountSettings::default(),
            login: LoginSettings::default(),
            worlds: default_worlds(),
            tables: default_tables(),
            catalog: CatalogSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Client generation served by a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// 2005 clients: session-token login, `_` in names.
    #[default]
    Engine1,
    Engine2,
    Engine3,
}

impl Engine {
    /// Whether passwords from this client may be learned as an alternate.
    pub fn learns_alternate_password(&self) -> bool {
        matches!(self, Self::Engine2)
    }
}

/// Socket flavour of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Raw TCP, `\0`-terminated frames.
    #[default]
    Tcp,
    /// WebSocket text frames.
    WebSocket,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerSettings {
    /// Address to bind (e.g. "0.0.0.0:6112").
    pub bind: String,
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default)]
    pub engine: Engine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub listeners: Vec<ListenerSettings>,
    /// Largest accepted inbound frame, in bytes.
    pub max_frame_len: usize,
    /// Seconds of silence before a connection is dropped. 0 disables.
    pub idle_timeout_secs: u64,
    /// Room joined by `s%js`.
    pub town_room: u32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listeners: vec![ListenerSettings {
                bind: "0.0.0.0:6112".to_string(),
                transport: TransportKind::Tcp,
                engine: Engine::Engine1,
            }],
            max_frame_len: igloo_transport::DEFAULT_MAX_FRAME_LEN,
            idle_timeout_secs: 0,
            town_room: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Accounts and login
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    /// JSON account file, rewritten after every change.
    pub path: Option<PathBuf>,
    /// Coins credited to new accounts.
    pub starting_coins: u32,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from("data/accounts.json")),
            starting_coins: 500,
        }
    }
}

/// Items that were never obtainable in play.
const BAIT_ITEMS: [u32; 16] = [
    130, 183, 230, 355, 371, 466, 532, 1977, 1978, 1999, 2999, 3999, 4999, 5999, 6999, 90000,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSettings {
    pub max_name_len: usize,
    /// Names refused with 441 on top of the built-in mascot and staff list.
    pub reserved_names: Vec<String>,
    /// Substrings that get a nickname banned on sight.
    pub blocked_terms: Vec<String>,
    /// Item ids no legitimate account can own; holding one at login bans.
    pub bait_items: Vec<u32>,
    /// Key returned to `rndK`.
    pub random_key: String,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            max_name_len: 12,
            reserved_names: Vec::new(),
            blocked_terms: Vec::new(),
            bait_items: BAIT_ITEMS.to_vec(),
            random_key: "igloo".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSettings {
    pub id: u32,
    #[serde(default)]
    pub population: u32,
}

fn default_worlds() -> Vec<WorldSettings> {
    vec![WorldSettings {
        id: 100,
        population: 0,
    }]
}

// ---------------------------------------------------------------------------
// Tables and catalog
// ---------------------------------------------------------------------------

/// A run of consecutive table ids in one room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSettings {
    pub room: u32,
    pub first_id: u32,
    #[serde(default = "default_table_count")]
    pub count: u32,
    #[serde(default = "default_game")]
    pub game: String,
}

fn default_table_count() -> u32 {
    1
}

fn default_game() -> String {
    "mancala".to_string()
}

fn default_tables() -> Vec<TableSettings> {
    vec![
        TableSettings {
            room: 111,
            first_id: 100,
            count: 5,
            game: default_game(),
        },
        TableSettings {
            room: 803,
            first_id: 105,
            count: 1,
            game: default_game(),
        },
    ]
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: u32,
    pub cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub items: Vec<CatalogEntry>,
    pub furniture: Vec<CatalogEntry>,
    /// Most furniture pieces one account may own.
    pub furniture_limit: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            furniture: Vec::new(),
            furniture_limit: 99,
        }
    }
}

impl CatalogSettings {
    pub fn item_cost(&self, id: u32) -> Option<u32> {
        self.items.iter().find(|e| e.id == id).map(|e| e.cost)
    }

    pub fn furniture_cost(&self, id: u32) -> Option<u32> {
        self.furniture.iter().find(|e| e.id == id).map(|e| e.cost)
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error). `RUST_LOG`
    /// overrides it.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

//! Configuration management
//!
//! Settings are read in this order of precedence:
//! 1. Environment variables
//! 2. `dont-forget.toml`
//! 3. Defaults
//!
//! `${VAR_NAME}` inside the config file expands to the environment variable.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;
use crate::user::User;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "dont-forget.toml";

/// Where flags and users are kept
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite database on disk
    #[default]
    Sqlite,
    /// Process memory, lost on exit
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "memory" | "in-memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            db_path: default_db_path(),
        }
    }
}

/// A user registered into the directory at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSeed {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub gm: bool,
}

impl From<UserSeed> for User {
    fn from(seed: UserSeed) -> Self {
        User {
            id: seed.id,
            name: seed.name,
            is_gm: seed.gm,
        }
    }
}

/// Client-scoped settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Show the reminders entry point in the player list
    #[serde(default = "default_inject_button")]
    pub inject_button: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            inject_button: default_inject_button(),
        }
    }
}

/// Main configuration for dont-forget
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub users: Vec<UserSeed>,

    #[serde(default)]
    pub client: ClientConfig,

    /// User to act as when none is given on the command line
    #[serde(default)]
    pub default_user: Option<String>,
}

fn default_db_path() -> String {
    "data/dont-forget.db".to_string()
}

fn default_inject_button() -> bool {
    true
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Expand `${VAR_NAME}` references; unset variables expand to nothing
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Parse configuration from TOML text, then apply environment overrides
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let mut cfg: Config = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        cfg.validate()?;
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Load `dont-forget.toml` from the working directory if present,
    /// otherwise configure from the environment alone
    pub fn load() -> crate::Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            return Self::from_toml_file(CONFIG_FILE);
        }
        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Config::default();
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> crate::Result<()> {
        if let Ok(backend) = std::env::var("DF_STORAGE_BACKEND") {
            if !backend.is_empty() {
                self.storage.backend = StorageBackend::parse(&backend)
                    .ok_or_else(|| Error::Config(format!("Unknown storage backend: {}", backend)))?;
            }
        }

        if let Ok(path) = std::env::var("DF_DB_PATH") {
            if !path.is_empty() {
                self.storage.db_path = path;
            }
        }

        if let Ok(value) = std::env::var("DF_INJECT_BUTTON") {
            self.client.inject_button = parse_bool(&value)
                .ok_or_else(|| Error::Config(format!("DF_INJECT_BUTTON must be a boolean, got {}", value)))?;
        }

        if let Ok(ids) = std::env::var("DF_GM_USER_IDS") {
            for id in ids.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match self.users.iter_mut().find(|u| u.id == id) {
                    Some(user) => user.gm = true,
                    None => self.users.push(UserSeed {
                        id: id.to_string(),
                        name: id.to_string(),
                        gm: true,
                    }),
                }
            }
        }

        if let Ok(user) = std::env::var("DF_USER") {
            if !user.is_empty() {
                self.default_user = Some(user);
            }
        }

        Ok(())
    }

    fn validate(&self) -> crate::Result<()> {
        for (i, user) in self.users.iter().enumerate() {
            if user.id.trim().is_empty() {
                return Err(Error::Config(format!("users[{}] has an empty id", i)));
            }
            if self.users[..i].iter().any(|u| u.id == user.id) {
                return Err(Error::Config(format!("Duplicate user id: {}", user.id)));
            }
        }
        Ok(())
    }
}

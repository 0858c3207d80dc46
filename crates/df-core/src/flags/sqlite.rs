//! Flag persistence using SQLite

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, params};
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{debug, info};

use crate::Result;
use crate::flags::store::{AttributeStore, merge_entries, remove_entry};

/// Shared SQLite connection backing both the attribute store and the
/// user directory
#[derive(Clone)]
pub struct SqliteHost {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHost {
    /// Open (or create) the database at the given path
    pub fn new(db_path: &str) -> Result<Self> {
        debug!("Opening host database at: {}", db_path);
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        let host = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        host.init_tables()?;
        info!("Host database initialized successfully");
        Ok(host)
    }

    /// Create an in-memory database (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let host = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        host.init_tables()?;
        Ok(host)
    }

    /// Initialize database tables
    fn init_tables(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                is_gm INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS flags (
                user_id TEXT NOT NULL,
                scope TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, scope, key)
            )",
            [],
        )?;

        Ok(())
    }

    /// Lock the connection. A poisoned lock still holds a usable
    /// connection since every write runs inside its own statement or
    /// transaction.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn read_flag(conn: &Connection, user_id: &str, scope: &str, key: &str) -> Result<Option<JsonValue>> {
    let result = conn.query_row(
        "SELECT value FROM flags WHERE user_id = ?1 AND scope = ?2 AND key = ?3",
        params![user_id, scope, key],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_flag(conn: &Connection, user_id: &str, scope: &str, key: &str, value: &JsonValue) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    conn.execute(
        "INSERT OR REPLACE INTO flags (user_id, scope, key, value, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, scope, key, raw, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// SQLite-based flag storage
#[derive(Clone)]
pub struct SqliteAttributeStore {
    host: SqliteHost,
}

impl SqliteAttributeStore {
    pub fn new(host: SqliteHost) -> Self {
        Self { host }
    }
}

#[async_trait]
impl AttributeStore for SqliteAttributeStore {
    async fn get_flag(&self, user_id: &str, scope: &str, key: &str) -> Result<Option<JsonValue>> {
        let conn = self.host.conn();
        read_flag(&conn, user_id, scope, key)
    }

    async fn set_flag(&self, user_id: &str, scope: &str, key: &str, value: JsonValue) -> Result<()> {
        let conn = self.host.conn();
        write_flag(&conn, user_id, scope, key, &value)?;
        debug!("Saved flag {}.{} for user {}", scope, key, user_id);
        Ok(())
    }

    async fn merge_flag(
        &self,
        user_id: &str,
        scope: &str,
        key: &str,
        entries: JsonMap<String, JsonValue>,
    ) -> Result<()> {
        let mut conn = self.host.conn();
        let tx = conn.transaction()?;
        let current = read_flag(&tx, user_id, scope, key)?;
        let count = entries.len();
        write_flag(&tx, user_id, scope, key, &merge_entries(current, entries))?;
        tx.commit()?;
        debug!("Merged {} entries into flag {}.{} for user {}", count, scope, key, user_id);
        Ok(())
    }

    async fn remove_flag_entry(&self, user_id: &str, scope: &str, key: &str, entry: &str) -> Result<bool> {
        let mut conn = self.host.conn();
        let tx = conn.transaction()?;
        let Some(mut current) = read_flag(&tx, user_id, scope, key)? else {
            return Ok(false);
        };
        if !remove_entry(&mut current, entry) {
            return Ok(false);
        }
        write_flag(&tx, user_id, scope, key, &current)?;
        tx.commit()?;
        debug!("Removed entry {} from flag {}.{} for user {}", entry, scope, key, user_id);
        Ok(true)
    }

    async fn unset_flag(&self, user_id: &str, scope: &str, key: &str) -> Result<()> {
        let rows_affected = self.host.conn().execute(
            "DELETE FROM flags WHERE user_id = ?1 AND scope = ?2 AND key = ?3",
            params![user_id, scope, key],
        )?;
        if rows_affected > 0 {
            debug!("Unset flag {}.{} for user {}", scope, key, user_id);
        }
        Ok(())
    }
}

//! User directory persisted in the host database

use async_trait::async_trait;
use rusqlite::params;
use tracing::debug;

use crate::Result;
use crate::flags::SqliteHost;
use crate::user::{User, UserDirectory};

/// SQLite-based user directory
#[derive(Clone)]
pub struct SqliteUserDirectory {
    host: SqliteHost,
}

impl SqliteUserDirectory {
    pub fn new(host: SqliteHost) -> Self {
        Self { host }
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn resolve_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.host.conn();
        let result = conn.query_row(
            "SELECT id, name, is_gm FROM users WHERE id = ?1",
            params![user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    is_gm: row.get(2)?,
                })
            },
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn enumerate_users(&self) -> Result<Vec<User>> {
        let conn = self.host.conn();
        let mut stmt = conn.prepare("SELECT id, name, is_gm FROM users ORDER BY id")?;

        let users = stmt
            .query_map([], |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    is_gm: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    async fn upsert_user(&self, user: User) -> Result<()> {
        self.host.conn().execute(
            "INSERT OR REPLACE INTO users (id, name, is_gm) VALUES (?1, ?2, ?3)",
            params![user.id, user.name, user.is_gm],
        )?;
        debug!("Registered user {} ({})", user.id, user.name);
        Ok(())
    }
}

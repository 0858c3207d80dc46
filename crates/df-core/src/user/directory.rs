//! User directory trait and in-memory implementation

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::Result;
use crate::user::User;

/// Directory of host users
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by id
    async fn resolve_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Every known user, ordered by id
    async fn enumerate_users(&self) -> Result<Vec<User>>;

    /// Insert or replace a user
    async fn upsert_user(&self, user: User) -> Result<()>;
}

/// In-memory user directory, for tests and ephemeral sessions
#[derive(Clone, Default)]
pub struct MemoryUserDirectory {
    users: Arc<DashMap<String, User>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory pre-populated with the given users
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let directory = Self::new();
        for user in users {
            directory.users.insert(user.id.clone(), user);
        }
        directory
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn resolve_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn enumerate_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn upsert_user(&self, user: User) -> Result<()> {
        debug!("Registering user {} ({})", user.id, user.name);
        self.users.insert(user.id.clone(), user);
        Ok(())
    }
}

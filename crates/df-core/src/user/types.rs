//! User type definitions

use serde::{Deserialize, Serialize};

/// A user known to the host, either a player or a game master
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Game masters may view and manage every user's reminders
    #[serde(default)]
    pub is_gm: bool,
}

impl User {
    /// Create a regular player
    pub fn player(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_gm: false,
        }
    }

    /// Create a game master
    pub fn gm(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_gm: true,
        }
    }
}

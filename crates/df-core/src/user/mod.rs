//! User directory
//!
//! Resolves user ids and enumerates every known user. The Reminder
//! Store only reads from the directory; `upsert_user` exists so hosts
//! can seed it.

mod directory;
mod sqlite;
mod types;

pub use directory::{MemoryUserDirectory, UserDirectory};
pub use sqlite::SqliteUserDirectory;
pub use types::User;

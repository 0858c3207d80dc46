//! df-core: dont-forget core library
//!
//! Per-user reminder lists backed by a per-user attribute store.
//! Game masters see and manage every user's reminders, other users
//! only their own.

pub mod config;
pub mod error;
pub mod flags;
pub mod id;
pub mod reminder;
pub mod settings;
pub mod user;

pub use config::{ClientConfig, Config, StorageBackend, StorageConfig, UserSeed};
pub use error::{Error, Result};
pub use flags::{AttributeStore, MemoryAttributeStore, SqliteAttributeStore, SqliteHost};
pub use id::{IdGenerator, RandomIdGenerator};
pub use reminder::{
    Reminder, ReminderChange, ReminderCollection, ReminderPatch, ReminderStore, RemindersChangeReceiver,
    RemindersChangeSender,
};
pub use settings::ClientSettings;
pub use user::{MemoryUserDirectory, SqliteUserDirectory, User, UserDirectory};

/// Flag scope every reminder collection is stored under
pub const MODULE_ID: &str = "dont-forget";

/// Flag key holding a user's reminder collection
pub const REMINDERS_FLAG: &str = "reminders";

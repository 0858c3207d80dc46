//! Per-user attribute ("flag") storage
//!
//! Every user owns a set of JSON values addressed by `(scope, key)`.
//! Writes come in three explicit modes: full replace (`set_flag`),
//! shallow per-key merge (`merge_flag`) and per-key delete
//! (`remove_flag_entry`). Two backends are provided: an in-memory map
//! and SQLite.

mod memory;
mod sqlite;
mod store;

pub use memory::MemoryAttributeStore;
pub use sqlite::{SqliteAttributeStore, SqliteHost};
pub use store::AttributeStore;

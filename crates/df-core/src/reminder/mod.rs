//! Reminder data layer
//!
//! Per-user reminder collections persisted as a single flag on each
//! user, plus the aggregate view game masters work with.

mod store;
mod types;

pub use store::{ReminderChange, ReminderStore, RemindersChangeReceiver, RemindersChangeSender};
pub use types::{Reminder, ReminderCollection, ReminderPatch};

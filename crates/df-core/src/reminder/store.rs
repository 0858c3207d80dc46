//! Reminder Store
//!
//! CRUD over per-user reminder collections. Game masters read the
//! aggregate of every user's collection, other users only their own.

use std::sync::Arc;

use serde_json::{Map as JsonMap, Value as JsonValue};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::flags::AttributeStore;
use crate::id::{IdGenerator, RandomIdGenerator};
use crate::reminder::types::{decode_collection, validate_entry};
use crate::reminder::{Reminder, ReminderCollection, ReminderPatch};
use crate::user::{User, UserDirectory};
use crate::{Error, MODULE_ID, REMINDERS_FLAG, Result};

pub type RemindersChangeSender = broadcast::Sender<ReminderChange>;
pub type RemindersChangeReceiver = broadcast::Receiver<ReminderChange>;

/// Emitted after every successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderChange {
    Created { reminder: Reminder },
    Updated { reminder: Reminder },
    Deleted { reminder_id: String, user_id: String },
    /// The whole collection of `user_id` was replaced or cleared
    Replaced { user_id: String },
}

/// Data access layer for reminders
#[derive(Clone)]
pub struct ReminderStore {
    users: Arc<dyn UserDirectory>,
    flags: Arc<dyn AttributeStore>,
    ids: Arc<dyn IdGenerator>,
    change_tx: Option<RemindersChangeSender>,
}

impl ReminderStore {
    /// Create a store over the given collaborators, with random ids
    pub fn new(users: Arc<dyn UserDirectory>, flags: Arc<dyn AttributeStore>) -> Self {
        Self {
            users,
            flags,
            ids: Arc::new(RandomIdGenerator),
            change_tx: None,
        }
    }

    /// Replace the identifier generator
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Publish a `ReminderChange` on `change_tx` after every write
    pub fn with_notifier(mut self, change_tx: RemindersChangeSender) -> Self {
        self.change_tx = Some(change_tx);
        self
    }

    /// Subscribe to changes, if a notifier is attached
    pub fn subscribe(&self) -> Option<RemindersChangeReceiver> {
        self.change_tx.as_ref().map(|tx| tx.subscribe())
    }

    pub fn users(&self) -> &Arc<dyn UserDirectory> {
        &self.users
    }

    /// Reminders visible to `requesting_user_id`: every user's for a game
    /// master, only their own otherwise
    pub async fn list(&self, requesting_user_id: &str) -> Result<ReminderCollection> {
        let user = self.require_user(requesting_user_id).await?;

        if user.is_gm {
            debug!("User {} is GM, listing every user's reminders", user.id);
            self.list_all().await
        } else {
            debug!("User {} is not GM, listing own reminders", user.id);
            self.list_for_user(&user.id).await
        }
    }

    /// Aggregate view over every user's collection
    pub async fn list_all(&self) -> Result<ReminderCollection> {
        let mut all = ReminderCollection::new();
        for user in self.users.enumerate_users().await? {
            for (id, reminder) in self.list_for_user(&user.id).await? {
                if all.contains_key(&id) {
                    warn!("Duplicate reminder id {} found for user {}, keeping the first", id, user.id);
                    continue;
                }
                all.insert(id, reminder);
            }
        }
        Ok(all)
    }

    /// Persisted collection of `user_id`. Unknown users have no reminders.
    pub async fn list_for_user(&self, user_id: &str) -> Result<ReminderCollection> {
        if self.users.resolve_user(user_id).await?.is_none() {
            debug!("No user {}, returning no reminders", user_id);
            return Ok(ReminderCollection::new());
        }
        let stored = self.flags.get_flag(user_id, MODULE_ID, REMINDERS_FLAG).await?;
        Ok(decode_collection(user_id, stored))
    }

    /// Create a reminder owned by `owner_user_id`.
    ///
    /// The id is freshly generated and the owner is always `owner_user_id`.
    /// Existing reminders of the owner are preserved.
    pub async fn create(&self, owner_user_id: &str, fields: ReminderPatch) -> Result<Reminder> {
        let owner = self.require_user(owner_user_id).await?;

        let mut reminder = Reminder {
            id: self.ids.new_id(),
            label: String::new(),
            is_done: false,
            user_id: owner.id.clone(),
        };
        reminder.apply(&fields);

        self.write_reminder(&reminder).await?;
        info!("Created reminder {} for user {}", reminder.id, owner.id);

        self.notify(ReminderChange::Created {
            reminder: reminder.clone(),
        });
        Ok(reminder)
    }

    /// Merge `patch` onto an existing reminder, wherever it lives
    pub async fn update(&self, reminder_id: &str, patch: ReminderPatch) -> Result<Reminder> {
        let mut reminder = match self.list_all().await?.remove(reminder_id) {
            Some(reminder) => reminder,
            None => {
                error!("Reminder with id {} not found", reminder_id);
                return Err(Error::ReminderNotFound(reminder_id.to_string()));
            }
        };

        // The owner is the reminder's own user id
        self.require_user(&reminder.user_id).await?;

        if patch.is_empty() {
            return Ok(reminder);
        }

        reminder.apply(&patch);
        self.write_reminder(&reminder).await?;
        debug!("Updated reminder {} for user {}", reminder.id, reminder.user_id);

        self.notify(ReminderChange::Updated {
            reminder: reminder.clone(),
        });
        Ok(reminder)
    }

    /// Replace the whole collection of `user_id` with `collection`.
    ///
    /// `collection` must be a JSON object of reminder objects, keyed by id,
    /// and none of its ids may belong to another user's collection.
    /// It is stored as given; reads normalize partial entries.
    pub async fn update_user_reminders(&self, user_id: &str, collection: JsonValue) -> Result<()> {
        if user_id.is_empty() {
            error!("Bulk reminder update without a user id");
            return Err(Error::InvalidInput("missing user id".to_string()));
        }

        let JsonValue::Object(entries) = &collection else {
            error!("Invalid update data provided for user {}", user_id);
            return Err(Error::InvalidInput(format!(
                "reminders for user {} must be an object keyed by reminder id",
                user_id
            )));
        };
        for (key, value) in entries {
            if let Err(reason) = validate_entry(key, value) {
                error!("Invalid update data provided for user {}: {}", user_id, reason);
                return Err(Error::InvalidInput(reason));
            }
        }

        let user = self.require_user(user_id).await?;

        // Ids must stay unique across every user's collection
        for other in self.users.enumerate_users().await? {
            if other.id == user.id {
                continue;
            }
            let taken = self.list_for_user(&other.id).await?;
            if let Some(id) = entries.keys().find(|id| taken.contains_key(id.as_str())) {
                error!("Reminder id {} for user {} is already used by user {}", id, user.id, other.id);
                return Err(Error::InvalidInput(format!("reminder id {} is already in use", id)));
            }
        }

        let count = entries.len();
        self.flags
            .set_flag(&user.id, MODULE_ID, REMINDERS_FLAG, collection)
            .await?;
        info!("Replaced reminders of user {} ({} entries)", user.id, count);

        self.notify(ReminderChange::Replaced { user_id: user.id });
        Ok(())
    }

    /// Delete one reminder owned by `owner_user_id`
    pub async fn delete(&self, reminder_id: &str, owner_user_id: &str) -> Result<()> {
        let owner = self.require_user(owner_user_id).await?;

        if !self.list_for_user(&owner.id).await?.contains_key(reminder_id) {
            error!("Reminder with id {} not found for user {}", reminder_id, owner.id);
            return Err(Error::ReminderNotFound(reminder_id.to_string()));
        }

        let removed = self
            .flags
            .remove_flag_entry(&owner.id, MODULE_ID, REMINDERS_FLAG, reminder_id)
            .await?;
        if !removed {
            // Deleted by someone else between the lookup and the write
            warn!("Reminder {} was already gone from user {}", reminder_id, owner.id);
            return Err(Error::ReminderNotFound(reminder_id.to_string()));
        }
        info!("Deleted reminder {} of user {}", reminder_id, owner.id);

        self.notify(ReminderChange::Deleted {
            reminder_id: reminder_id.to_string(),
            user_id: owner.id,
        });
        Ok(())
    }

    /// Remove every reminder of `user_id`
    pub async fn clear(&self, user_id: &str) -> Result<()> {
        let user = self.require_user(user_id).await?;
        self.flags.unset_flag(&user.id, MODULE_ID, REMINDERS_FLAG).await?;
        info!("Cleared reminders of user {}", user.id);

        self.notify(ReminderChange::Replaced { user_id: user.id });
        Ok(())
    }

    async fn require_user(&self, user_id: &str) -> Result<User> {
        match self.users.resolve_user(user_id).await? {
            Some(user) => Ok(user),
            None => {
                error!("User with id {} not found", user_id);
                Err(Error::UserNotFound(user_id.to_string()))
            }
        }
    }

    /// Merge one reminder into its owner's collection
    async fn write_reminder(&self, reminder: &Reminder) -> Result<()> {
        let mut entries = JsonMap::new();
        entries.insert(reminder.id.clone(), serde_json::to_value(reminder)?);
        self.flags
            .merge_flag(&reminder.user_id, MODULE_ID, REMINDERS_FLAG, entries)
            .await
    }

    fn notify(&self, change: ReminderChange) {
        if let Some(tx) = &self.change_tx {
            let _ = tx.send(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{MemoryAttributeStore, SqliteAttributeStore, SqliteHost};
    use crate::user::{MemoryUserDirectory, SqliteUserDirectory};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SequentialIds(AtomicUsize);

    impl IdGenerator for SequentialIds {
        fn new_id(&self) -> String {
            format!("r{}", self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    struct Fixture {
        store: ReminderStore,
        flags: MemoryAttributeStore,
    }

    fn fixture() -> Fixture {
        let users = MemoryUserDirectory::with_users([
            User::gm("gm", "Gamemaster"),
            User::player("alice", "Alice"),
            User::player("bob", "Bob"),
        ]);
        let flags = MemoryAttributeStore::new();
        let store = ReminderStore::new(Arc::new(users), Arc::new(flags.clone()));
        Fixture { store, flags }
    }

    async fn snapshot(f: &Fixture) -> Vec<Option<JsonValue>> {
        let mut out = Vec::new();
        for user in ["gm", "alice", "bob"] {
            out.push(f.flags.get_flag(user, MODULE_ID, REMINDERS_FLAG).await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_create_reminder() -> Result<()> {
        let f = fixture();
        let existing = f.store.create("alice", ReminderPatch::label("Feed the horse")).await?;

        let reminder = f.store.create("alice", ReminderPatch::label("Buy milk")).await?;
        assert_eq!(reminder.label, "Buy milk");
        assert_eq!(reminder.user_id, "alice");
        assert!(!reminder.is_done);
        assert_ne!(reminder.id, existing.id);

        let collection = f.store.list_for_user("alice").await?;
        assert_eq!(collection.len(), 2);
        assert_eq!(collection[&reminder.id], reminder);
        assert_eq!(collection[&existing.id], existing);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_honours_is_done_override() -> Result<()> {
        let f = fixture();
        let reminder = f
            .store
            .create("bob", ReminderPatch::label("Already done").with_done(true))
            .await?;
        assert!(reminder.is_done);

        let empty = f.store.create("bob", ReminderPatch::new()).await?;
        assert_eq!(empty.label, "");
        assert!(!empty.is_done);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_unknown_user_writes_nothing() {
        let f = fixture();
        let result = f.store.create("nobody", ReminderPatch::label("x")).await;
        assert!(matches!(result, Err(Error::UserNotFound(id)) if id == "nobody"));
        assert!(f.flags.is_empty());
    }

    #[tokio::test]
    async fn test_list_for_unknown_user_is_empty() -> Result<()> {
        let f = fixture();
        assert!(f.store.list_for_user("nobody").await?.is_empty());
        assert!(f.store.list_for_user("alice").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_visibility() -> Result<()> {
        let f = fixture();
        let a = f.store.create("alice", ReminderPatch::label("a")).await?;
        let b = f.store.create("bob", ReminderPatch::label("b")).await?;
        let g = f.store.create("gm", ReminderPatch::label("g")).await?;

        // GM sees the union of every user's collection
        let all = f.store.list("gm").await?;
        assert_eq!(all.len(), 3);
        for r in [&a, &b, &g] {
            assert_eq!(&all[&r.id], r);
        }

        // Players see exactly their own collection
        assert_eq!(f.store.list("alice").await?, f.store.list_for_user("alice").await?);
        assert_eq!(f.store.list("bob").await?.len(), 1);
        assert!(f.store.list("bob").await?.contains_key(&b.id));

        assert!(matches!(f.store.list("nobody").await, Err(Error::UserNotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_only_touches_patched_fields() -> Result<()> {
        let f = fixture();
        let target = f.store.create("alice", ReminderPatch::label("Buy milk")).await?;
        let sibling = f.store.create("alice", ReminderPatch::label("Sharpen sword")).await?;

        let updated = f.store.update(&target.id, ReminderPatch::done(true)).await?;
        assert!(updated.is_done);
        assert_eq!(updated.label, "Buy milk");
        assert_eq!(updated.user_id, "alice");

        let collection = f.store.list_for_user("alice").await?;
        assert_eq!(collection[&target.id], updated);
        assert_eq!(collection[&sibling.id], sibling);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_toggles_freely() -> Result<()> {
        let f = fixture();
        let r = f.store.create("bob", ReminderPatch::label("Rest")).await?;

        for expected in [true, false, true] {
            let updated = f.store.update(&r.id, ReminderPatch::done(expected)).await?;
            assert_eq!(updated.is_done, expected);
        }
        let relabeled = f.store.update(&r.id, ReminderPatch::label("Long rest")).await?;
        assert_eq!(relabeled.label, "Long rest");
        assert!(relabeled.is_done);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_update_is_noop() -> Result<()> {
        let f = fixture();
        let created = f.store.create("alice", ReminderPatch::label("Buy milk")).await?;
        let updated = f.store.update(&created.id, ReminderPatch::new()).await?;
        assert_eq!(updated, created);
        assert_eq!(f.store.list_for_user("alice").await?[&created.id], created);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_reminder_changes_nothing() -> Result<()> {
        let f = fixture();
        f.store.create("alice", ReminderPatch::label("a")).await?;
        f.store.create("bob", ReminderPatch::label("b")).await?;
        let before = snapshot(&f).await;

        let result = f.store.update("nonexistent-id", ReminderPatch::done(true)).await;
        assert!(matches!(result, Err(Error::ReminderNotFound(_))));

        let result = f.store.delete("nonexistent-id", "alice").await;
        assert!(matches!(result, Err(Error::ReminderNotFound(_))));

        assert_eq!(snapshot(&f).await, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one() -> Result<()> {
        let f = fixture();
        let doomed = f.store.create("alice", ReminderPatch::label("a")).await?;
        let kept = f.store.create("alice", ReminderPatch::label("b").with_done(true)).await?;
        let other = f.store.create("bob", ReminderPatch::label("c")).await?;

        f.store.delete(&doomed.id, "alice").await?;

        let alice = f.store.list_for_user("alice").await?;
        assert!(!alice.contains_key(&doomed.id));
        assert_eq!(alice[&kept.id], kept);
        assert_eq!(f.store.list_for_user("bob").await?[&other.id], other);

        // Deleted is terminal
        assert!(matches!(
            f.store.update(&doomed.id, ReminderPatch::done(true)).await,
            Err(Error::ReminderNotFound(_))
        ));
        assert!(matches!(
            f.store.delete(&doomed.id, "alice").await,
            Err(Error::ReminderNotFound(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_checks_ownership() -> Result<()> {
        let f = fixture();
        let bobs = f.store.create("bob", ReminderPatch::label("mine")).await?;

        let result = f.store.delete(&bobs.id, "alice").await;
        assert!(matches!(result, Err(Error::ReminderNotFound(_))));
        assert!(f.store.list_for_user("bob").await?.contains_key(&bobs.id));

        let result = f.store.delete(&bobs.id, "nobody").await;
        assert!(matches!(result, Err(Error::UserNotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_user_reminders_replaces() -> Result<()> {
        let f = fixture();
        let old = f.store.create("alice", ReminderPatch::label("old")).await?;
        let bobs = f.store.create("bob", ReminderPatch::label("bob's")).await?;

        f.store
            .update_user_reminders(
                "alice",
                json!({
                    "n1": {"id": "n1", "label": "Scout ahead", "isDone": true, "userId": "alice"},
                    "n2": {"label": "Partial entry"}
                }),
            )
            .await?;

        let alice = f.store.list_for_user("alice").await?;
        assert_eq!(alice.len(), 2);
        assert!(!alice.contains_key(&old.id));
        assert!(alice["n1"].is_done);
        assert_eq!(alice["n2"].label, "Partial entry");
        assert_eq!(alice["n2"].user_id, "alice");
        assert!(!alice["n2"].is_done);

        // Other users untouched
        assert_eq!(f.store.list_for_user("bob").await?[&bobs.id], bobs);

        // Partial entries can still be updated afterwards
        let updated = f.store.update("n2", ReminderPatch::done(true)).await?;
        assert_eq!(updated.label, "Partial entry");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_user_reminders_rejects_bad_input() -> Result<()> {
        let f = fixture();
        f.store.create("alice", ReminderPatch::label("keep")).await?;
        let before = snapshot(&f).await;

        for bad in [json!(null), json!("text"), json!([1]), json!({"a": 1}), json!({"a": {"isDone": "no"}})] {
            let result = f.store.update_user_reminders("alice", bad).await;
            assert!(matches!(result, Err(Error::InvalidInput(_))));
        }
        assert!(matches!(
            f.store.update_user_reminders("", json!({})).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            f.store.update_user_reminders("nobody", json!({})).await,
            Err(Error::UserNotFound(_))
        ));

        assert_eq!(snapshot(&f).await, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_user_reminders_keeps_ids_unique() -> Result<()> {
        let f = fixture();
        let alices = f.store.create("alice", ReminderPatch::label("Alice's task")).await?;
        let bobs = f.store.create("bob", ReminderPatch::label("Bob's task")).await?;
        let before = snapshot(&f).await;

        let mut stolen = JsonMap::new();
        stolen.insert(alices.id.clone(), json!({"label": "bob task"}));
        let result = f.store.update_user_reminders("bob", JsonValue::Object(stolen)).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(snapshot(&f).await, before);

        // The aggregate still holds every per-user entry
        let mut union = 0;
        for user in ["gm", "alice", "bob"] {
            union += f.store.list_for_user(user).await?.len();
        }
        assert_eq!(f.store.list("gm").await?.len(), union);

        // Re-submitting the user's own ids is fine
        let mut own = JsonMap::new();
        own.insert(bobs.id.clone(), json!({"label": "Bob's task", "isDone": true}));
        f.store.update_user_reminders("bob", JsonValue::Object(own)).await?;
        assert!(f.store.list_for_user("bob").await?[&bobs.id].is_done);
        Ok(())
    }

    #[tokio::test]
    async fn test_clear() -> Result<()> {
        let f = fixture();
        f.store.create("alice", ReminderPatch::label("a")).await?;
        f.store.create("alice", ReminderPatch::label("b")).await?;
        let bobs = f.store.create("bob", ReminderPatch::label("c")).await?;

        f.store.clear("alice").await?;
        assert!(f.store.list_for_user("alice").await?.is_empty());
        assert!(f.flags.get_flag("alice", MODULE_ID, REMINDERS_FLAG).await?.is_none());
        assert_eq!(f.store.list_for_user("bob").await?[&bobs.id], bobs);

        assert!(matches!(f.store.clear("nobody").await, Err(Error::UserNotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_injected_id_generator() -> Result<()> {
        let f = fixture();
        let store = f.store.with_id_generator(Arc::new(SequentialIds(AtomicUsize::new(1))));
        assert_eq!(store.create("alice", ReminderPatch::label("a")).await?.id, "r1");
        assert_eq!(store.create("bob", ReminderPatch::label("b")).await?.id, "r2");
        assert_eq!(store.list("gm").await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_change_notifications() -> Result<()> {
        let (tx, _) = broadcast::channel(16);
        let store = fixture().store.with_notifier(tx);
        let mut rx = store.subscribe().unwrap();

        let r = store.create("alice", ReminderPatch::label("a")).await?;
        assert_eq!(rx.recv().await.unwrap(), ReminderChange::Created { reminder: r.clone() });

        let updated = store.update(&r.id, ReminderPatch::done(true)).await?;
        assert_eq!(rx.recv().await.unwrap(), ReminderChange::Updated { reminder: updated });

        store.delete(&r.id, "alice").await?;
        assert_eq!(
            rx.recv().await.unwrap(),
            ReminderChange::Deleted {
                reminder_id: r.id.clone(),
                user_id: "alice".into()
            }
        );

        store.update_user_reminders("bob", json!({})).await?;
        assert_eq!(
            rx.recv().await.unwrap(),
            ReminderChange::Replaced { user_id: "bob".into() }
        );

        store.clear("alice").await?;
        assert_eq!(
            rx.recv().await.unwrap(),
            ReminderChange::Replaced { user_id: "alice".into() }
        );

        let kept = store.create("alice", ReminderPatch::label("b")).await?;
        rx.recv().await.unwrap();

        // Failed operations and empty patches publish nothing
        let _ = store.delete("missing", "alice").await;
        store.update(&kept.id, ReminderPatch::new()).await?;
        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_sqlite_backend() -> Result<()> {
        let host = SqliteHost::in_memory()?;
        let users = SqliteUserDirectory::new(host.clone());
        users.upsert_user(User::gm("gm", "Gamemaster")).await?;
        users.upsert_user(User::player("alice", "Alice")).await?;
        let store = ReminderStore::new(Arc::new(users), Arc::new(SqliteAttributeStore::new(host)));

        let a = store.create("alice", ReminderPatch::label("Buy milk")).await?;
        let g = store.create("gm", ReminderPatch::label("Prep session")).await?;
        store.update(&a.id, ReminderPatch::done(true)).await?;

        let all = store.list("gm").await?;
        assert_eq!(all.len(), 2);
        assert!(all[&a.id].is_done);

        store.delete(&g.id, "gm").await?;
        assert!(store.list_for_user("gm").await?.is_empty());
        assert_eq!(store.list("alice").await?.len(), 1);
        Ok(())
    }
}

//! Reminder type definitions

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

/// A single user-owned to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// Unique identifier, assigned at creation
    pub id: String,
    /// The text of the reminder
    pub label: String,
    /// Marks whether the reminder is done
    pub is_done: bool,
    /// The user who owns this reminder
    pub user_id: String,
}

/// One user's reminders, keyed by reminder id
pub type ReminderCollection = HashMap<String, Reminder>;

impl Reminder {
    /// Overlay the fields present in `patch`
    pub fn apply(&mut self, patch: &ReminderPatch) {
        if let Some(label) = &patch.label {
            self.label = label.clone();
        }
        if let Some(is_done) = patch.is_done {
            self.is_done = is_done;
        }
    }

    /// Rebuild a reminder from a persisted collection entry.
    ///
    /// The map key is the id and the collection owner is the user, whatever
    /// the entry itself says. Missing fields fall back to their defaults.
    pub(crate) fn from_stored(key: &str, owner: &str, value: JsonValue) -> Option<Self> {
        if !value.is_object() {
            warn!("Skipping malformed reminder {} for user {}: not an object", key, owner);
            return None;
        }
        match serde_json::from_value::<StoredReminder>(value) {
            Ok(stored) => Some(Self {
                id: key.to_string(),
                label: stored.label.unwrap_or_default(),
                is_done: stored.is_done.unwrap_or(false),
                user_id: owner.to_string(),
            }),
            Err(e) => {
                warn!("Skipping malformed reminder {} for user {}: {}", key, owner, e);
                None
            }
        }
    }
}

/// Decode a persisted collection flag into reminders
pub(crate) fn decode_collection(owner: &str, value: Option<JsonValue>) -> ReminderCollection {
    match value {
        Some(JsonValue::Object(entries)) => entries
            .into_iter()
            .filter_map(|(key, entry)| Reminder::from_stored(&key, owner, entry).map(|r| (key, r)))
            .collect(),
        Some(JsonValue::Null) | None => ReminderCollection::new(),
        Some(other) => {
            warn!("Ignoring reminders flag for user {}: expected an object, got {}", owner, other);
            ReminderCollection::new()
        }
    }
}

/// Check that a bulk-replace entry can be read back as a reminder
pub(crate) fn validate_entry(key: &str, value: &JsonValue) -> Result<(), String> {
    if !value.is_object() {
        return Err(format!("reminder {} is not an object", key));
    }
    StoredReminder::deserialize(value)
        .map(|_| ())
        .map_err(|e| format!("reminder {}: {}", key, e))
}

/// Persisted entry as written by any past writer, possibly partial
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredReminder {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    is_done: Option<bool>,
}

/// Partial set of the mutable reminder fields.
///
/// `id` and `user_id` are not part of a patch; the store assigns them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_done: Option<bool>,
}

impl ReminderPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch that only sets the label
    pub fn label(label: impl Into<String>) -> Self {
        Self::new().with_label(label)
    }

    /// Patch that only sets the completion flag
    pub fn done(is_done: bool) -> Self {
        Self::new().with_done(is_done)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_done(mut self, is_done: bool) -> Self {
        self.is_done = Some(is_done);
        self
    }

    /// True when the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.is_done.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reminder() -> Reminder {
        Reminder {
            id: "r1".into(),
            label: "Buy milk".into(),
            is_done: false,
            user_id: "u1".into(),
        }
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(reminder()).unwrap();
        assert_eq!(
            value,
            json!({"id": "r1", "label": "Buy milk", "isDone": false, "userId": "u1"})
        );
    }

    #[test]
    fn test_apply_patch() {
        let mut r = reminder();
        r.apply(&ReminderPatch::done(true));
        assert!(r.is_done);
        assert_eq!(r.label, "Buy milk");

        r.apply(&ReminderPatch::label("Buy oat milk"));
        assert_eq!(r.label, "Buy oat milk");
        assert!(r.is_done);

        let before = r.clone();
        r.apply(&ReminderPatch::new());
        assert_eq!(r, before);
    }

    #[test]
    fn test_patch_ignores_id_and_user_id() {
        let patch: ReminderPatch =
            serde_json::from_value(json!({"id": "forged", "userId": "u2", "label": "x"})).unwrap();
        assert_eq!(patch, ReminderPatch::label("x"));
        assert!(!patch.is_empty());
        assert!(ReminderPatch::new().is_empty());
    }

    #[test]
    fn test_from_stored_uses_key_and_owner() {
        let stored = json!({"id": "other", "label": "Map the dungeon", "userId": "u9"});
        let r = Reminder::from_stored("r1", "u1", stored).unwrap();
        assert_eq!(r.id, "r1");
        assert_eq!(r.user_id, "u1");
        assert_eq!(r.label, "Map the dungeon");
        assert!(!r.is_done);
    }

    #[test]
    fn test_decode_collection_skips_malformed() {
        let collection = decode_collection(
            "u1",
            Some(json!({
                "a": {"label": "ok", "isDone": true},
                "b": "not an object",
                "c": {"isDone": "yes"}
            })),
        );
        assert_eq!(collection.len(), 1);
        assert!(collection["a"].is_done);

        assert!(decode_collection("u1", None).is_empty());
        assert!(decode_collection("u1", Some(json!([1, 2]))).is_empty());
    }
}

//! Attribute store trait and shared write semantics

use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::Result;

/// Host-provided per-user key-value storage
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Read a flag, `None` if it was never stored
    async fn get_flag(&self, user_id: &str, scope: &str, key: &str) -> Result<Option<JsonValue>>;

    /// Replace the whole flag value
    async fn set_flag(&self, user_id: &str, scope: &str, key: &str, value: JsonValue) -> Result<()>;

    /// Shallow-merge `entries` into the stored object, key by key.
    /// A missing or non-object stored value is replaced by `entries`.
    async fn merge_flag(
        &self,
        user_id: &str,
        scope: &str,
        key: &str,
        entries: JsonMap<String, JsonValue>,
    ) -> Result<()>;

    /// Remove one entry from the stored object.
    /// Returns whether the entry existed.
    async fn remove_flag_entry(&self, user_id: &str, scope: &str, key: &str, entry: &str) -> Result<bool>;

    /// Remove the whole flag
    async fn unset_flag(&self, user_id: &str, scope: &str, key: &str) -> Result<()>;
}

/// Apply a shallow merge on top of the currently stored value
pub(crate) fn merge_entries(current: Option<JsonValue>, entries: JsonMap<String, JsonValue>) -> JsonValue {
    let mut merged = match current {
        Some(JsonValue::Object(map)) => map,
        _ => JsonMap::new(),
    };
    for (k, v) in entries {
        merged.insert(k, v);
    }
    JsonValue::Object(merged)
}

/// Drop one entry from the stored value, if it is an object holding it
pub(crate) fn remove_entry(current: &mut JsonValue, entry: &str) -> bool {
    match current {
        JsonValue::Object(map) => map.remove(entry).is_some(),
        _ => false,
    }
}

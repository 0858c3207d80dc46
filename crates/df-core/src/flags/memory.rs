//! In-memory attribute store
//!
//! Thread-safe flag storage using DashMap

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::debug;

use crate::Result;
use crate::flags::store::{AttributeStore, merge_entries, remove_entry};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FlagKey {
    user_id: String,
    scope: String,
    key: String,
}

impl FlagKey {
    fn new(user_id: &str, scope: &str, key: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            scope: scope.to_string(),
            key: key.to_string(),
        }
    }
}

/// In-memory flag storage
#[derive(Clone, Default)]
pub struct MemoryAttributeStore {
    flags: Arc<DashMap<FlagKey, JsonValue>>,
}

impl MemoryAttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[async_trait]
impl AttributeStore for MemoryAttributeStore {
    async fn get_flag(&self, user_id: &str, scope: &str, key: &str) -> Result<Option<JsonValue>> {
        Ok(self
            .flags
            .get(&FlagKey::new(user_id, scope, key))
            .map(|v| v.clone()))
    }

    async fn set_flag(&self, user_id: &str, scope: &str, key: &str, value: JsonValue) -> Result<()> {
        self.flags.insert(FlagKey::new(user_id, scope, key), value);
        debug!("Set flag {}.{} for user {}", scope, key, user_id);
        Ok(())
    }

    async fn merge_flag(
        &self,
        user_id: &str,
        scope: &str,
        key: &str,
        entries: JsonMap<String, JsonValue>,
    ) -> Result<()> {
        let count = entries.len();
        match self.flags.entry(FlagKey::new(user_id, scope, key)) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get_mut().take();
                *occupied.get_mut() = merge_entries(Some(current), entries);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(merge_entries(None, entries));
            }
        }
        debug!("Merged {} entries into flag {}.{} for user {}", count, scope, key, user_id);
        Ok(())
    }

    async fn remove_flag_entry(&self, user_id: &str, scope: &str, key: &str, entry: &str) -> Result<bool> {
        let removed = match self.flags.get_mut(&FlagKey::new(user_id, scope, key)) {
            Some(mut value) => remove_entry(value.value_mut(), entry),
            None => false,
        };
        if removed {
            debug!("Removed entry {} from flag {}.{} for user {}", entry, scope, key, user_id);
        }
        Ok(removed)
    }

    async fn unset_flag(&self, user_id: &str, scope: &str, key: &str) -> Result<()> {
        self.flags.remove(&FlagKey::new(user_id, scope, key));
        Ok(())
    }
}

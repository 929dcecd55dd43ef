use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use oas_stub_sdk::SessionStorage;
use serde_json::Value;

use crate::domain::clock::{Clock, SystemClock};

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

/// Session store for plugins. Entries expire lazily: an expired entry is
/// dropped by the read that finds it.
pub struct InMemorySessionStorage {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InMemorySessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySessionStorage")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl Default for InMemorySessionStorage {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl InMemorySessionStorage {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    fn is_live(&self, entry: &Entry) -> bool {
        entry.expires_at.is_none_or(|at| self.clock.now() < at)
    }
}

impl SessionStorage for InMemorySessionStorage {
    fn put(&self, key: &str, value: Value, ttl: Duration) {
        let expires_at = (!ttl.is_zero()).then(|| self.clock.now() + ttl);
        self.entries
            .insert(key.to_owned(), Entry { value, expires_at });
    }

    fn get(&self, key: &str) -> Option<Value> {
        let live = self
            .entries
            .get(key)
            .map(|e| self.is_live(&e).then(|| e.value.clone()))?;
        if live.is_none() {
            self.entries.remove_if(key, |_, e| !self.is_live(e));
        }
        live
    }

    fn delete(&self, key: &str) -> Option<Value> {
        let (_, entry) = self.entries.remove(key)?;
        self.is_live(&entry).then_some(entry.value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::ManualClock;

    #[test]
    fn zero_ttl_never_expires() {
        let clock = Arc::new(ManualClock::new());
        let storage = InMemorySessionStorage::new(clock.clone());
        storage.put("k", json!(1), Duration::ZERO);
        clock.advance(Duration::from_secs(86_400));
        assert_eq!(storage.get("k"), Some(json!(1)));
    }

    #[test]
    fn entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::new());
        let storage = InMemorySessionStorage::new(clock.clone());
        storage.put("k", json!("v"), Duration::from_secs(10));
        clock.advance(Duration::from_secs(9));
        assert_eq!(storage.get("k"), Some(json!("v")));
        clock.advance(Duration::from_secs(1));
        assert_eq!(storage.get("k"), None);
        assert_eq!(storage.delete("k"), None);
    }

    #[test]
    fn delete_returns_live_value() {
        let storage = InMemorySessionStorage::default();
        storage.put("k", json!({"a": 1}), Duration::ZERO);
        assert_eq!(storage.delete("k"), Some(json!({"a": 1})));
        assert_eq!(storage.get("k"), None);
    }
}

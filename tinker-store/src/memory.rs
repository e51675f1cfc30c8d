//! In-memory store implementation

use crate::error::{StoreError, StoreResult};
use crate::KeyValueStore;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// An in-memory key-value store.
///
/// Clones share the same data, which lets a host and its tests observe
/// the same storage.
///
/// # Example
/// ```
/// use tinker_store::{KeyValueStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.set("k", "v").unwrap();
/// assert!(store.contains("k"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: Arc::new(RwLock::new(map)),
        }
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable {
        message: String::from("Lock poisoned"),
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_is_empty() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("anything").unwrap(), None);
    }

    #[test]
    fn test_set_and_get() {
        let store = MemoryStore::new();
        store.set("code", "console.log(1)").unwrap();
        assert_eq!(store.get("code").unwrap().as_deref(), Some("console.log(1)"));
    }

    #[test]
    fn test_overwrite() {
        let store = MemoryStore::new();
        store.set("k", "first").unwrap();
        store.set("k", "second").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_value_is_present() {
        let store = MemoryStore::new();
        store.set("k", "").unwrap();
        assert!(store.contains("k"));
        assert_eq!(store.get("k").unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_remove() {
        let store = MemoryStore::with_entries([("a", "1"), ("b", "2")]);
        store.remove("a").unwrap();
        store.remove("missing").unwrap();
        assert!(!store.contains("a"));
        assert!(store.contains("b"));
    }

    #[test]
    fn test_clone_shares_data() {
        let a = MemoryStore::new();
        let b = a.clone();
        b.set("shared", "yes").unwrap();
        assert_eq!(a.get("shared").unwrap().as_deref(), Some("yes"));
    }
}

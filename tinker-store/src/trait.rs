//! KeyValueStore trait definition

use crate::error::StoreResult;

/// Persistent key-value storage
///
/// Keys and values are strings. Entries never expire. Each store instance is
/// scoped to one origin.
///
/// # Implementations
/// - `MemoryStore`: in-memory map, lost when the process exits
/// - `FileStore`: one file per key under an origin directory
pub trait KeyValueStore {
    /// Read a value
    ///
    /// # Returns
    /// `Ok(None)` when the key has never been written
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete a value; deleting a missing key is not an error
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Check if a key has a value
    fn contains(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(Some(_)))
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::rc::Rc<S> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }
}

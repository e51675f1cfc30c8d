//! File-backed store implementation

use crate::error::{StoreError, StoreResult};
use crate::KeyValueStore;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A key-value store that keeps one file per key.
///
/// Values live under `<root>/<origin>/<encoded key>`. Keys are
/// percent-encoded so any string maps onto a single file name.
///
/// # Example
/// ```
/// use tinker_store::{FileStore, KeyValueStore};
///
/// let dir = std::env::temp_dir().join("tinker-store-doc");
/// let store = FileStore::new(&dir, "local");
/// store.set("greeting", "hello").unwrap();
/// assert_eq!(store.get("greeting").unwrap().as_deref(), Some("hello"));
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root` for the given origin.
    ///
    /// The directory is created lazily on first write.
    pub fn new(root: &Path, origin: &str) -> Self {
        Self {
            dir: root.join(encode_key(origin)),
        }
    }

    /// Directory holding this origin's values
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
                reason: String::from("key must not be empty"),
            });
        }
        Ok(self.dir.join(encode_key(key)))
    }
}

/// Encode a key as a portable file name
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => out.push(byte as char),
            // leading dots would produce hidden or relative names
            b'.' if !out.is_empty() => out.push('.'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| StoreError::Corrupt {
                key: key.to_string(),
            })
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        // write then rename so a crash never leaves a half-written value
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp~");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, value.as_bytes())?;
        std::fs::rename(&tmp, &path)?;

        debug!(target: "tinker::store", key, path = %path.display(), bytes = value.len(), "stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path(), "local");
        (dir, store)
    }

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("tinker.session"), "tinker.session");
        assert_eq!(encode_key("a/b"), "a%2Fb");
        assert_eq!(encode_key(".hidden"), "%2Ehidden");
        assert_eq!(encode_key("x y"), "x%20y");
    }

    #[test]
    fn test_missing_key_is_none() {
        let (_dir, store) = temp_store();
        assert_eq!(store.get("nothing").unwrap(), None);
        assert!(!store.contains("nothing"));
    }

    #[test]
    fn test_set_get_overwrite() {
        let (_dir, store) = temp_store();
        store.set("tinker.session", "{\"a\":1}").unwrap();
        assert_eq!(store.get("tinker.session").unwrap().as_deref(), Some("{\"a\":1}"));

        store.set("tinker.session", "{}").unwrap();
        assert_eq!(store.get("tinker.session").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_values_survive_new_instance() {
        let (dir, store) = temp_store();
        store.set("k", "persisted").unwrap();

        let reopened = FileStore::new(dir.path(), "local");
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("persisted"));
    }

    #[test]
    fn test_origins_are_isolated() {
        let dir = TempDir::new().unwrap();
        let a = FileStore::new(dir.path(), "origin-a");
        let b = FileStore::new(dir.path(), "origin-b");
        a.set("k", "a").unwrap();
        assert_eq!(b.get("k").unwrap(), None);
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let (_dir, store) = temp_store();
        store.remove("never-written").unwrap();
        store.set("k", "v").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_empty_key_rejected() {
        let (_dir, store) = temp_store();
        assert!(matches!(store.set("", "v"), Err(StoreError::InvalidKey { .. })));
    }

    #[test]
    fn test_invalid_utf8_is_corrupt() {
        let (_dir, store) = temp_store();
        store.set("k", "v").unwrap();
        std::fs::write(store.dir().join("k"), [0xff, 0xfe]).unwrap();
        assert_eq!(
            store.get("k"),
            Err(StoreError::Corrupt {
                key: "k".to_string()
            })
        );
    }
}

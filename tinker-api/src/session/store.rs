//! Session state persistence
//!
//! The buffer and its dialect are saved together as one JSON record under a
//! single key, so every save is one write. Saves are fire-and-forget: a
//! failing backend is logged and otherwise ignored.

use super::examples::canned_example;
use serde::{Deserialize, Serialize};
use tinker_config::{Dialect, StorageOptions};
use tinker_store::{KeyValueStore, StoreError};
use tracing::{debug, warn};

/// What a session persists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub source: String,
    pub dialect: Dialect,
}

impl SessionRecord {
    /// The canned example of `dialect`
    pub fn example(dialect: Dialect) -> Self {
        Self {
            source: canned_example(dialect).to_string(),
            dialect,
        }
    }
}

pub struct SessionStore {
    backend: Box<dyn KeyValueStore>,
    key: String,
    default_dialect: Dialect,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("key", &self.key)
            .field("default_dialect", &self.default_dialect)
            .finish()
    }
}

impl SessionStore {
    pub fn new(backend: Box<dyn KeyValueStore>, options: &StorageOptions, default_dialect: Dialect) -> Self {
        Self {
            backend,
            key: options.session_key.clone(),
            default_dialect,
        }
    }

    /// Persist the buffer and dialect, logging any failure
    pub fn save(&self, source: &str, dialect: Dialect) {
        if let Err(err) = self.try_save(source, dialect) {
            warn!(target: "tinker::session", key = %self.key, %err, "failed to save session");
        }
    }

    pub fn try_save(&self, source: &str, dialect: Dialect) -> Result<(), StoreError> {
        let record = SessionRecord {
            source: source.to_string(),
            dialect,
        };
        let json = serde_json::to_string(&record).map_err(|e| StoreError::Io { message: e.to_string() })?;
        self.backend.set(&self.key, &json)?;
        debug!(target: "tinker::session", dialect = dialect.as_str(), bytes = source.len(), "session saved");
        Ok(())
    }

    /// The saved session, or the default dialect's canned example
    pub fn load(&self) -> SessionRecord {
        match self.backend.get(&self.key) {
            Ok(Some(json)) => match serde_json::from_str::<SessionRecord>(&json) {
                Ok(record) => {
                    debug!(target: "tinker::session", dialect = record.dialect.as_str(), "session restored");
                    record
                }
                Err(err) => {
                    warn!(target: "tinker::session", %err, "saved session is unreadable; using defaults");
                    SessionRecord::example(self.default_dialect)
                }
            },
            Ok(None) => SessionRecord::example(self.default_dialect),
            Err(err) => {
                warn!(target: "tinker::session", %err, "failed to read session; using defaults");
                SessionRecord::example(self.default_dialect)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use tinker_store::{MemoryStore, StoreResult};

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Unavailable {
                message: "quota".to_string(),
            })
        }

        fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable {
                message: "quota".to_string(),
            })
        }

        fn remove(&self, _key: &str) -> StoreResult<()> {
            Ok(())
        }
    }

    fn store_over(backend: Rc<MemoryStore>) -> SessionStore {
        SessionStore::new(Box::new(backend), &StorageOptions::default(), Dialect::Typed)
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let store = store_over(Rc::new(MemoryStore::new()));
        store.save("console.log(1)", Dialect::Untyped);
        assert_eq!(
            store.load(),
            SessionRecord {
                source: "console.log(1)".to_string(),
                dialect: Dialect::Untyped,
            }
        );
    }

    #[test]
    fn test_record_is_one_json_document_under_the_session_key() {
        let backend = Rc::new(MemoryStore::new());
        store_over(backend.clone()).save("x", Dialect::Typed);
        assert_eq!(backend.len(), 1);
        let json = backend.get("tinker.session").unwrap().unwrap();
        assert_eq!(json, r#"{"source":"x","dialect":"typed"}"#);
    }

    #[test]
    fn test_missing_or_unreadable_state_loads_defaults() {
        let backend = Rc::new(MemoryStore::new());
        let store = store_over(backend.clone());
        assert_eq!(store.load(), SessionRecord::example(Dialect::Typed));
        backend.set("tinker.session", "not json").unwrap();
        assert_eq!(store.load(), SessionRecord::example(Dialect::Typed));
        backend.set("tinker.session", r#"{"source":"x","dialect":"cobol"}"#).unwrap();
        assert_eq!(store.load(), SessionRecord::example(Dialect::Typed));
    }

    #[test]
    fn test_failing_backend_is_invisible() {
        let store = SessionStore::new(Box::new(BrokenStore), &StorageOptions::default(), Dialect::Untyped);
        store.save("lost", Dialect::Typed);
        assert!(store.try_save("lost", Dialect::Typed).is_err());
        assert_eq!(store.load(), SessionRecord::example(Dialect::Untyped));
    }
}

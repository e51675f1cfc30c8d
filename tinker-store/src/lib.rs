//! Tinker key-value storage
//!
//! Persistent string storage scoped to an origin, with no expiry.
//!
//! # Usage
//! ```rust
//! use tinker_store::{KeyValueStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.set("tinker.session", "{}").unwrap();
//! assert_eq!(store.get("tinker.session").unwrap().as_deref(), Some("{}"));
//! ```

mod error;
mod file;
mod memory;
mod r#trait;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use r#trait::KeyValueStore;

/// Create a new memory-backed store.
pub fn memory_store() -> MemoryStore {
    MemoryStore::new()
}

//! In-memory block store for testing.

use crate::error::StorageResult;
use crate::store::{validate_key, BlockStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory block store.
///
/// This store keeps every value in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral sessions that don't need persistence
///
/// # Example
///
/// ```rust
/// use recipebox_storage::{BlockStore, InMemoryBlockStore};
///
/// let store = InMemoryBlockStore::new("scratch");
/// assert!(store.get("data").unwrap().is_none());
/// store.put("data", b"v1").unwrap();
/// assert_eq!(store.data("data").unwrap(), b"v1");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBlockStore {
    name: String,
    blocks: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBlockStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: RwLock::new(BTreeMap::new()),
        }
    }

    /// Creates a store with one pre-existing value.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_entry(name: impl Into<String>, key: &str, value: Vec<u8>) -> Self {
        let store = Self::new(name);
        store.blocks.write().insert(key.to_string(), value);
        store
    }

    /// Returns a copy of the value under `key`, if any.
    #[must_use]
    pub fn data(&self, key: &str) -> Option<Vec<u8>> {
        self.blocks.read().get(key).cloned()
    }
}

impl BlockStore for InMemoryBlockStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.blocks.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        self.blocks.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn destroy(&self) -> StorageResult<()> {
        self.blocks.write().clear();
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.blocks.read().keys().cloned().collect())
    }
}

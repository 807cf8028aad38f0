//! Block store trait definition.

use crate::error::{StorageError, StorageResult};
use std::sync::Arc;

/// A durable, key-addressed store of opaque blobs.
///
/// Block stores have full-replace semantics only: there is no append, no
/// partial write and no versioning. Recipebox owns the interpretation of
/// every value.
///
/// # Invariants
///
/// - `get` returns exactly the bytes of the last successful `put` for that key
/// - `put` is atomic per key; an interrupted write leaves the previous value
/// - `destroy` removes every key; the store stays usable afterwards
///
/// # Implementors
///
/// - [`super::InMemoryBlockStore`] - For testing
/// - [`super::FileBlockStore`] - For persistent storage
pub trait BlockStore: Send + Sync {
    /// Returns the name this store was opened with.
    fn name(&self) -> &str;

    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing has been written under the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or an I/O error occurs.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the value stored under `key`.
    ///
    /// After this returns successfully the value survives process termination
    /// (for persistent stores).
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails.
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Deletes every value in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the values cannot be removed.
    fn destroy(&self) -> StorageResult<()>;

    /// Lists the keys currently holding a value, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be enumerated.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

impl<T: BlockStore + ?Sized> BlockStore for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        (**self).put(key, value)
    }

    fn destroy(&self) -> StorageResult<()> {
        (**self).destroy()
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }
}

/// Checks that `key` can be used as a block name.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] for empty keys or keys containing
/// anything other than ASCII alphanumerics, `_` and `-`.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::invalid_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_keys() {
        assert!(validate_key("data").is_ok());
        assert!(validate_key("recipe-app_db2").is_ok());
    }

    #[test]
    fn rejects_path_like_keys() {
        for key in ["", "../data", "a/b", "data.blob", "spa ce"] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey { .. })),
                "{key:?} should be rejected"
            );
        }
    }

    #[test]
    fn shared_store_sees_same_blobs() {
        let store = Arc::new(crate::InMemoryBlockStore::new("shared"));
        let handle: Box<dyn BlockStore> = Box::new(Arc::clone(&store));
        handle.put("data", b"abc").unwrap();
        assert_eq!(handle.name(), "shared");
        assert_eq!(store.get("data").unwrap().as_deref(), Some(&b"abc"[..]));
    }
}

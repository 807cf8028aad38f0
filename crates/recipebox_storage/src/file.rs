//! File-based block store for persistent storage.
//!
//! On-disk layout:
//!
//! ```text
//! <root>/<name>/
//! ├─ LOCK              # Advisory lock for single-session access
//! ├─ <key>.blob        # One file per key
//! └─ <key>.blob.tmp    # Staging file, only present mid-write
//! ```

use crate::error::{StorageError, StorageResult};
use crate::store::{validate_key, BlockStore};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCK_FILE: &str = "LOCK";
const BLOB_EXT: &str = "blob";
const TEMP_SUFFIX: &str = ".tmp";

/// A file-based block store.
///
/// Values survive process restarts. Each `put` writes a staging file, syncs
/// it, and renames it over the previous value, so a crash mid-write leaves
/// the prior value intact.
///
/// # Thread Safety
///
/// The store holds an exclusive lock on its directory for as long as it is
/// open; a second `open` of the same store fails with
/// [`StorageError::Locked`]. Writes within the process are serialized.
///
/// # Example
///
/// ```no_run
/// use recipebox_storage::{BlockStore, FileBlockStore};
/// use std::path::Path;
///
/// let store = FileBlockStore::open(Path::new("data"), "recipe-app-db").unwrap();
/// store.put("data", b"persistent image").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBlockStore {
    name: String,
    dir: PathBuf,
    _lock_file: File,
    write_lock: Mutex<()>,
}

impl FileBlockStore {
    /// Opens or creates the store `name` under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `name` is not a valid key
    /// - The directory cannot be created
    /// - Another session holds the store (`Locked`)
    pub fn open(root: &Path, name: &str) -> StorageResult<Self> {
        validate_key(name)?;
        let dir = root.join(name);
        fs::create_dir_all(&dir)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                name: name.to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            dir,
            _lock_file: lock_file,
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the directory holding this store's files.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{BLOB_EXT}"))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{BLOB_EXT}{TEMP_SUFFIX}"))
    }

    #[cfg(unix)]
    fn sync_dir(&self) -> StorageResult<()> {
        File::open(&self.dir)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_dir(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl BlockStore for FileBlockStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        match fs::read(self.blob_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        let _guard = self.write_lock.lock();

        let temp = self.temp_path(key);
        {
            let mut file = File::create(&temp)?;
            file.write_all(value)?;
            file.sync_all()?;
        }
        fs::rename(&temp, self.blob_path(key))?;
        self.sync_dir()?;

        debug!(store = %self.name, key, bytes = value.len(), "block written");
        Ok(())
    }

    fn destroy(&self) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_block = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n != LOCK_FILE);
            if is_block && path.is_file() {
                fs::remove_file(&path)?;
            }
        }
        self.sync_dir()?;
        debug!(store = %self.name, "block store destroyed");
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(BLOB_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let store = FileBlockStore::open(dir.path(), "db").unwrap();
        assert_eq!(store.name(), "db");
        assert!(store.path().join(LOCK_FILE).exists());
        assert!(store.get("data").unwrap().is_none());
    }

    #[test]
    fn file_put_and_get() {
        let dir = tempdir().unwrap();
        let store = FileBlockStore::open(dir.path(), "db").unwrap();

        store.put("data", b"hello world").unwrap();
        assert_eq!(store.get("data").unwrap().unwrap(), b"hello world");
        assert!(!store.temp_path("data").exists());
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();

        {
            let store = FileBlockStore::open(dir.path(), "db").unwrap();
            store.put("data", b"persistent data").unwrap();
        }

        {
            let store = FileBlockStore::open(dir.path(), "db").unwrap();
            assert_eq!(store.get("data").unwrap().unwrap(), b"persistent data");
        }
    }

    #[test]
    fn file_put_replaces_value() {
        let dir = tempdir().unwrap();
        let store = FileBlockStore::open(dir.path(), "db").unwrap();
        store.put("data", b"first and longer").unwrap();
        store.put("data", b"second").unwrap();
        assert_eq!(store.get("data").unwrap().unwrap(), b"second");
    }

    #[test]
    fn file_second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _first = FileBlockStore::open(dir.path(), "db").unwrap();
        let second = FileBlockStore::open(dir.path(), "db");
        assert!(matches!(second, Err(StorageError::Locked { .. })));
    }

    #[test]
    fn file_destroy_keeps_store_usable() {
        let dir = tempdir().unwrap();
        let store = FileBlockStore::open(dir.path(), "db").unwrap();
        store.put("data", b"x").unwrap();
        store.put("extra", b"y").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["data", "extra"]);

        store.destroy().unwrap();
        assert!(store.keys().unwrap().is_empty());
        assert!(store.get("data").unwrap().is_none());

        store.put("data", b"z").unwrap();
        assert_eq!(store.get("data").unwrap().unwrap(), b"z");
    }

    #[test]
    fn file_stale_temp_is_ignored() {
        let dir = tempdir().unwrap();
        let store = FileBlockStore::open(dir.path(), "db").unwrap();
        store.put("data", b"committed").unwrap();

        // A crash between staging and rename leaves a temp file behind
        fs::write(store.temp_path("data"), b"half").unwrap();

        assert_eq!(store.get("data").unwrap().unwrap(), b"committed");
        assert_eq!(store.keys().unwrap(), vec!["data"]);
    }

    #[test]
    fn file_rejects_invalid_store_name() {
        let dir = tempdir().unwrap();
        let result = FileBlockStore::open(dir.path(), "../escape");
        assert!(matches!(result, Err(StorageError::InvalidKey { .. })));
    }
}

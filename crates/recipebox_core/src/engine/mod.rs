//! Engine lifecycle: startup, migration, corruption recovery and snapshots.
//!
//! The engine owns one in-memory SQLite connection and one block store. The
//! store holds a single blob, the full database image, which is rewritten
//! after every committed mutation.
//!
//! # Startup
//!
//! 1. Read the image from the store (a read failure is fatal)
//! 2. No image: apply the schema, persist, then import the configured seed
//! 3. Image present: open it, probe it and run pending migrations. If any of
//!    that fails the image is treated as corrupt and replaced by an empty
//!    database (never seeded)
//! 4. Persist again if a migration changed the schema
//!
//! Concurrent callers of [`Engine::ensure_ready`] share one startup.

pub(crate) mod image;

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::interchange::{self, ImportMode};
use crate::migration::{self, MigrationReport};
use crate::schema;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use recipebox_storage::{BlockStore, FileBlockStore, InMemoryBlockStore};
use rusqlite::{Connection, Transaction};
use std::path::Path;
use tracing::{debug, info, warn};

/// The embedded query engine and its persisted snapshot.
///
/// Share it as `Arc<Engine>`; all access is serialized on one lock.
///
/// # Example
///
/// ```rust,ignore
/// use recipebox_core::{Config, Engine};
///
/// let engine = Engine::open(Path::new("data"), Config::default())?;
/// let count = engine.read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM recipes", [], |r| r.get::<_, i64>(0))?))?;
/// ```
pub struct Engine {
    store: Box<dyn BlockStore>,
    config: Config,
    /// `None` until started, and again after [`close`](Self::close).
    conn: Mutex<Option<Connection>>,
}

impl Engine {
    /// Creates an engine over `store` without starting it.
    pub fn new(store: impl BlockStore + 'static, config: Config) -> Self {
        Self {
            store: Box::new(store),
            config,
            conn: Mutex::new(None),
        }
    }

    /// Opens (or creates) the file-backed store `<root>/<store_name>` and
    /// starts the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is locked by another process or startup
    /// fails.
    pub fn open(root: &Path, config: Config) -> CoreResult<Self> {
        let store = FileBlockStore::open(root, &config.store_name)?;
        let engine = Self::new(store, config);
        engine.ensure_ready()?;
        Ok(engine)
    }

    /// Starts an engine whose snapshot lives only in memory.
    pub fn open_in_memory(config: Config) -> CoreResult<Self> {
        let store = InMemoryBlockStore::new(config.store_name.clone());
        let engine = Self::new(store, config);
        engine.ensure_ready()?;
        Ok(engine)
    }

    /// Brings the engine to the ready state, running startup at most once.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Initialization`] if the store cannot be read or
    /// the initial image cannot be persisted.
    pub fn ensure_ready(&self) -> CoreResult<()> {
        let mut slot = self.conn.lock();
        if slot.is_some() {
            return Ok(());
        }
        let conn = self.start().map_err(|e| match e {
            CoreError::Initialization { .. } => e,
            other => CoreError::initialization(other.to_string()),
        })?;
        *slot = Some(conn);
        Ok(())
    }

    /// Returns true once startup has completed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.conn.lock().is_some()
    }

    fn start(&self) -> CoreResult<Connection> {
        let stored = self
            .store
            .get(&self.config.image_key)
            .map_err(|e| CoreError::initialization(format!("cannot read snapshot: {e}")))?;

        let Some(bytes) = stored else {
            info!(store = self.store.name(), "no snapshot found, creating database");
            let mut conn = image::fresh()?;
            self.save(&conn)?;
            if let Some(seed) = self.config.seed.as_deref() {
                self.seed(&mut conn, seed);
            }
            return Ok(conn);
        };

        match Self::load(&bytes) {
            Ok((conn, report)) => {
                if !report.is_noop() {
                    self.save(&conn)?;
                }
                info!(
                    store = self.store.name(),
                    bytes = bytes.len(),
                    migrations = report.applied_count(),
                    "snapshot loaded"
                );
                Ok(conn)
            }
            Err(e) => {
                warn!(
                    store = self.store.name(),
                    error = %e,
                    "snapshot is unreadable, starting with an empty database"
                );
                let conn = image::fresh()?;
                self.save(&conn)?;
                Ok(conn)
            }
        }
    }

    /// Opens, probes and migrates an image.
    fn load(bytes: &[u8]) -> CoreResult<(Connection, MigrationReport)> {
        let conn = image::open(bytes)?;
        schema::probe(&conn)?;
        let report = migration::run_pending(&conn)?;
        Ok((conn, report))
    }

    /// Imports the first-run seed. Failures are logged and otherwise ignored.
    fn seed(&self, conn: &mut Connection, document: &str) {
        let result = interchange::parse_document(document)
            .and_then(|items| interchange::import_into(conn, &items, ImportMode::Skip));
        match result {
            Ok(report) => {
                for error in &report.errors {
                    warn!(%error, "seed recipe skipped");
                }
                if report.imported > 0 {
                    if let Err(e) = self.save(conn) {
                        warn!(error = %e, "failed to persist seeded database");
                        return;
                    }
                }
                info!(imported = report.imported, "seeded new database");
            }
            Err(e) => warn!(error = %e, "failed to seed new database"),
        }
    }

    fn save(&self, conn: &Connection) -> CoreResult<()> {
        let bytes = image::export(conn)?;
        self.store.put(&self.config.image_key, &bytes)?;
        debug!(store = self.store.name(), bytes = bytes.len(), "snapshot persisted");
        Ok(())
    }

    /// Locks and returns the live connection.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotInitialized`] before startup or after close.
    pub fn connection(&self) -> CoreResult<MappedMutexGuard<'_, Connection>> {
        MutexGuard::try_map(self.conn.lock(), Option::as_mut).map_err(|_| CoreError::NotInitialized)
    }

    /// Runs a read-only operation.
    pub fn read<T, F>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&Connection) -> CoreResult<T>,
    {
        let conn = self.connection()?;
        f(&conn)
    }

    /// Runs a mutation in a transaction and persists the image once it commits.
    ///
    /// If `f` fails the transaction is rolled back. If the image cannot be
    /// persisted the live database is reloaded from the last snapshot, so a
    /// failed call leaves no trace either way.
    pub fn write<T, F>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    {
        self.transact(f, |_| true)
    }

    /// Runs a mutation that may turn out to change nothing.
    ///
    /// The transaction is committed and persisted only when `f` returns `Some`.
    pub fn mutate<T, F>(&self, f: F) -> CoreResult<Option<T>>
    where
        F: FnOnce(&mut Transaction<'_>) -> CoreResult<Option<T>>,
    {
        self.transact(f, Option::is_some)
    }

    fn transact<R, F, C>(&self, f: F, changed: C) -> CoreResult<R>
    where
        F: FnOnce(&mut Transaction<'_>) -> CoreResult<R>,
        C: FnOnce(&R) -> bool,
    {
        let mut slot = self.conn.lock();
        let conn = slot.as_mut().ok_or(CoreError::NotInitialized)?;

        let mut tx = conn.transaction()?;
        let value = f(&mut tx)?;
        if !changed(&value) {
            return Ok(value);
        }
        tx.commit()?;

        if let Err(e) = self.save(conn) {
            self.revert(&mut slot);
            return Err(e);
        }
        Ok(value)
    }

    /// Replaces the live database with the last persisted snapshot.
    ///
    /// Leaves the engine uninitialized if the snapshot cannot be read back.
    fn revert(&self, slot: &mut Option<Connection>) {
        let reloaded = match self.store.get(&self.config.image_key) {
            Ok(Some(bytes)) => Self::load(&bytes).map(|(conn, _)| conn),
            Ok(None) => Err(CoreError::NotInitialized),
            Err(e) => Err(e.into()),
        };
        match reloaded {
            Ok(conn) => {
                *slot = Some(conn);
                warn!(store = self.store.name(), "snapshot not persisted, change reverted");
            }
            Err(e) => {
                *slot = None;
                warn!(store = self.store.name(), error = %e, "snapshot not persisted, engine closed");
            }
        }
    }

    /// Writes the current image to the store.
    pub fn persist(&self) -> CoreResult<()> {
        let conn = self.connection()?;
        self.save(&conn)
    }

    /// Serializes the current database.
    pub fn export_image(&self) -> CoreResult<Vec<u8>> {
        let conn = self.connection()?;
        image::export(&conn)
    }

    /// Replaces the live database with `bytes` and persists it.
    ///
    /// The image is probed, migrated and persisted before the swap; if any of
    /// that fails the live database is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IncompatibleImage`] if the image is rejected.
    pub fn install_image(&self, bytes: &[u8]) -> CoreResult<MigrationReport> {
        let mut conn = self.connection()?;
        let (replacement, report) =
            Self::load(bytes).map_err(|e| CoreError::incompatible_image(e.to_string()))?;
        self.save(&replacement)?;
        *conn = replacement;
        info!(
            bytes = bytes.len(),
            migrations = report.applied_count(),
            "database image installed"
        );
        Ok(report)
    }

    /// Destroys the persisted store and starts over, seeding if configured.
    pub fn reset(&self) -> CoreResult<()> {
        {
            let mut slot = self.conn.lock();
            self.store.destroy()?;
            *slot = None;
        }
        warn!(store = self.store.name(), "database reset");
        self.ensure_ready()
    }

    /// Drops the live connection. The next [`ensure_ready`](Self::ensure_ready)
    /// reloads the persisted image.
    pub fn close(&self) {
        if self.conn.lock().take().is_some() {
            debug!(store = self.store.name(), "engine closed");
        }
    }

    /// Reads the schema version of the live database.
    pub fn schema_version(&self) -> CoreResult<u32> {
        self.read(schema::user_version)
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the name of the underlying block store.
    #[must_use]
    pub fn store_name(&self) -> &str {
        self.store.name()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store.name())
            .field("image_key", &self.config.image_key)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::LEGACY_TABLE;
    use recipebox_storage::{StorageError, StorageResult};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn count(engine: &Engine) -> i64 {
        engine
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM recipes", [], |r| r.get(0))?))
            .unwrap()
    }

    fn insert(conn: &Connection, id: &str) -> CoreResult<()> {
        conn.execute(
            "INSERT INTO recipes (id, title, created_at, updated_at) VALUES (?1, 'T', 't', 't')",
            [id],
        )?;
        Ok(())
    }

    /// Store whose writes always fail.
    struct ReadOnlyStore;

    impl BlockStore for ReadOnlyStore {
        fn name(&self) -> &str {
            "read-only"
        }

        fn get(&self, _key: &str) -> StorageResult<Option<Vec<u8>>> {
            Ok(None)
        }

        fn put(&self, _key: &str, _value: &[u8]) -> StorageResult<()> {
            Err(StorageError::Io(std::io::Error::other("read-only")))
        }

        fn destroy(&self) -> StorageResult<()> {
            Ok(())
        }

        fn keys(&self) -> StorageResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn fresh_store_starts_empty_and_persists() {
        let store = Arc::new(InMemoryBlockStore::new("kitchen"));
        let engine = Engine::new(Arc::clone(&store), Config::new());
        assert!(!engine.is_ready());

        engine.ensure_ready().unwrap();
        assert!(engine.is_ready());
        assert_eq!(count(&engine), 0);
        assert!(store.data("data").is_some());
        assert_eq!(engine.schema_version().unwrap(), schema::SCHEMA_VERSION);
    }

    #[test]
    fn fresh_store_is_seeded() {
        let engine = Engine::open_in_memory(Config::new().with_sample_recipes()).unwrap();
        assert_eq!(count(&engine), 3);
    }

    #[test]
    fn ensure_ready_is_idempotent() {
        let engine = Engine::open_in_memory(Config::new().with_sample_recipes()).unwrap();
        engine.ensure_ready().unwrap();
        engine.ensure_ready().unwrap();
        assert_eq!(count(&engine), 3);
    }

    #[test]
    fn invalid_seed_leaves_empty_database() {
        let config = Config::new().seed(Some("{ not json".into()));
        let engine = Engine::open_in_memory(config).unwrap();
        assert_eq!(count(&engine), 0);
    }

    #[test]
    fn persisted_image_is_reloaded() {
        let store = Arc::new(InMemoryBlockStore::new("kitchen"));
        let engine = Engine::new(Arc::clone(&store), Config::new());
        engine.ensure_ready().unwrap();
        engine.write(|conn| insert(conn, "a")).unwrap();
        drop(engine);

        let reopened = Engine::new(Arc::clone(&store), Config::new().with_sample_recipes());
        reopened.ensure_ready().unwrap();
        assert_eq!(count(&reopened), 1);
    }

    #[test]
    fn close_then_ensure_ready_reloads() {
        let engine = Engine::open_in_memory(Config::new()).unwrap();
        engine.write(|conn| insert(conn, "a")).unwrap();
        engine.close();
        assert!(matches!(engine.connection(), Err(CoreError::NotInitialized)));

        engine.ensure_ready().unwrap();
        assert_eq!(count(&engine), 1);
    }

    #[test]
    fn corrupt_image_resets_without_seeding() {
        let store = Arc::new(InMemoryBlockStore::with_entry("kitchen", "data", vec![7; 2048]));
        let engine = Engine::new(Arc::clone(&store), Config::new().with_sample_recipes());
        engine.ensure_ready().unwrap();

        assert_eq!(count(&engine), 0);
        let persisted = store.data("data").unwrap();
        assert!(persisted.starts_with(b"SQLite format 3\0"));
    }

    #[test]
    fn foreign_database_is_treated_as_corrupt() {
        let foreign = Connection::open_in_memory().unwrap();
        foreign.execute_batch("CREATE TABLE notes (body TEXT)").unwrap();
        let bytes = image::export(&foreign).unwrap();

        let store = InMemoryBlockStore::with_entry("kitchen", "data", bytes);
        let engine = Engine::new(store, Config::new());
        engine.ensure_ready().unwrap();
        assert_eq!(count(&engine), 0);
    }

    #[test]
    fn legacy_image_is_migrated_and_persisted() {
        let legacy = Connection::open_in_memory().unwrap();
        legacy.execute_batch(LEGACY_TABLE).unwrap();
        insert(&legacy, "old").unwrap();
        let bytes = image::export(&legacy).unwrap();

        let store = Arc::new(InMemoryBlockStore::with_entry("kitchen", "data", bytes.clone()));
        let engine = Engine::new(Arc::clone(&store), Config::new());
        engine.ensure_ready().unwrap();

        assert_eq!(count(&engine), 1);
        let rating: Option<i64> = engine
            .read(|c| Ok(c.query_row("SELECT rating FROM recipes", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(rating, None);
        assert_ne!(store.data("data").unwrap(), bytes);
    }

    #[test]
    fn unpersistable_store_fails_initialization() {
        let engine = Engine::new(ReadOnlyStore, Config::new());
        assert!(matches!(
            engine.ensure_ready(),
            Err(CoreError::Initialization { .. })
        ));
        assert!(!engine.is_ready());
    }

    #[test]
    fn operations_before_startup_fail() {
        let engine = Engine::new(InMemoryBlockStore::new("kitchen"), Config::new());
        assert!(matches!(engine.connection(), Err(CoreError::NotInitialized)));
        assert!(matches!(engine.export_image(), Err(CoreError::NotInitialized)));
    }

    #[test]
    fn failed_write_is_rolled_back() {
        let store = Arc::new(InMemoryBlockStore::new("kitchen"));
        let engine = Engine::new(Arc::clone(&store), Config::new());
        engine.ensure_ready().unwrap();
        let before = store.data("data").unwrap();

        let result: CoreResult<()> = engine.write(|conn| {
            insert(conn, "ghost")?;
            Err(CoreError::invalid_document("boom"))
        });
        assert!(result.is_err());
        assert_eq!(store.data("data").unwrap(), before);
        assert_eq!(count(&engine), 0);

        // The next successful write must not carry the abandoned row along.
        engine.write(|conn| insert(conn, "real")).unwrap();
        let reopened = Engine::new(Arc::clone(&store), Config::new());
        reopened.ensure_ready().unwrap();
        assert_eq!(count(&reopened), 1);
    }

    /// In-memory store whose writes can be switched off.
    struct FlakyStore {
        inner: InMemoryBlockStore,
        failing: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: InMemoryBlockStore::new("flaky"),
                failing: AtomicBool::new(false),
            }
        }

        fn fail_writes(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    impl BlockStore for FlakyStore {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.inner.put(key, value)
        }

        fn destroy(&self) -> StorageResult<()> {
            self.inner.destroy()
        }

        fn keys(&self) -> StorageResult<Vec<String>> {
            self.inner.keys()
        }
    }

    #[test]
    fn unpersisted_write_is_reverted() {
        let store = Arc::new(FlakyStore::new());
        let engine = Engine::new(Arc::clone(&store), Config::new());
        engine.ensure_ready().unwrap();
        engine.write(|conn| insert(conn, "kept")).unwrap();

        store.fail_writes(true);
        assert!(engine.write(|conn| insert(conn, "lost")).is_err());
        assert!(engine.is_ready());
        assert_eq!(count(&engine), 1);

        store.fail_writes(false);
        engine.write(|conn| insert(conn, "after")).unwrap();
        let ids: Vec<String> = engine
            .read(|conn| {
                let mut stmt = conn.prepare("SELECT id FROM recipes ORDER BY id")?;
                let ids = stmt.query_map([], |r| r.get(0))?.collect::<Result<_, _>>()?;
                Ok(ids)
            })
            .unwrap();
        assert_eq!(ids, ["after", "kept"]);
    }

    #[test]
    fn unpersisted_image_install_keeps_live_database() {
        let source = Engine::open_in_memory(Config::new()).unwrap();
        source.write(|conn| insert(conn, "x")).unwrap();
        let bytes = source.export_image().unwrap();

        let store = Arc::new(FlakyStore::new());
        let engine = Engine::new(Arc::clone(&store), Config::new().with_sample_recipes());
        engine.ensure_ready().unwrap();
        let before = store.inner.data("data").unwrap();

        store.fail_writes(true);
        assert!(engine.install_image(&bytes).is_err());
        assert_eq!(count(&engine), 3);
        assert_eq!(store.inner.data("data").unwrap(), before);
    }

    #[test]
    fn mutate_persists_only_on_change() {
        let store = Arc::new(InMemoryBlockStore::new("kitchen"));
        let engine = Engine::new(Arc::clone(&store), Config::new());
        engine.ensure_ready().unwrap();
        let before = store.data("data").unwrap();

        let nothing: Option<()> = engine.mutate(|_| Ok(None)).unwrap();
        assert!(nothing.is_none());
        assert_eq!(store.data("data").unwrap(), before);

        engine.mutate(|conn| insert(conn, "a").map(Some)).unwrap();
        assert_ne!(store.data("data").unwrap(), before);
    }

    #[test]
    fn install_image_replaces_database() {
        let source = Engine::open_in_memory(Config::new()).unwrap();
        source.write(|conn| insert(conn, "x")).unwrap();
        source.write(|conn| insert(conn, "y")).unwrap();
        let bytes = source.export_image().unwrap();

        let target = Engine::open_in_memory(Config::new().with_sample_recipes()).unwrap();
        let report = target.install_image(&bytes).unwrap();
        assert!(report.is_noop());
        assert_eq!(count(&target), 2);
    }

    #[test]
    fn rejected_image_leaves_database_untouched() {
        let engine = Engine::open_in_memory(Config::new().with_sample_recipes()).unwrap();
        let result = engine.install_image(b"definitely not a database");
        assert!(matches!(result, Err(CoreError::IncompatibleImage { .. })));
        assert_eq!(count(&engine), 3);
    }

    #[test]
    fn reset_destroys_and_reseeds() {
        let store = Arc::new(InMemoryBlockStore::new("kitchen"));
        let engine = Engine::new(Arc::clone(&store), Config::new().with_sample_recipes());
        engine.ensure_ready().unwrap();
        engine.write(|conn| insert(conn, "extra")).unwrap();
        assert_eq!(count(&engine), 4);

        engine.reset().unwrap();
        assert_eq!(count(&engine), 3);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let engine = Engine::open(dir.path(), Config::new()).unwrap();
            engine.write(|conn| insert(conn, "a")).unwrap();
        }
        let engine = Engine::open(dir.path(), Config::new()).unwrap();
        assert_eq!(count(&engine), 1);
        assert_eq!(engine.store_name(), "recipe-app-db");
    }
}

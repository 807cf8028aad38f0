//! Test fixtures and engine helpers.
//!
//! Provides convenience functions for setting up throwaway recipe stores
//! and common test scenarios.

use recipebox_core::{
    BackupManager, Config, Engine, Ingredient, Recipe, RecipeDraft, Repository,
};
use recipebox_storage::{BlockStore, InMemoryBlockStore, StorageResult};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// In-memory block store that counts snapshot writes.
#[derive(Debug)]
pub struct CountingBlockStore {
    inner: InMemoryBlockStore,
    puts: AtomicUsize,
}

impl CountingBlockStore {
    /// Creates an empty store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: InMemoryBlockStore::new(name),
            puts: AtomicUsize::new(0),
        }
    }

    /// Number of successful `put` calls so far.
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl BlockStore for CountingBlockStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.inner.put(key, value)?;
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn destroy(&self) -> StorageResult<()> {
        self.inner.destroy()
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        self.inner.keys()
    }
}

/// A started engine with automatic cleanup.
pub struct TestEngine {
    /// The engine instance.
    pub engine: Arc<Engine>,
    /// Shared snapshot store, for memory engines that get reopened.
    store: Option<Arc<CountingBlockStore>>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestEngine {
    /// Creates an empty in-memory engine.
    pub fn memory() -> Self {
        Self::memory_with(Config::new())
    }

    /// Creates an in-memory engine seeded with the sample recipes.
    pub fn seeded() -> Self {
        Self::memory_with(Config::new().with_sample_recipes())
    }

    /// Creates an in-memory engine with `config`.
    ///
    /// The snapshot store is kept so [`reopen`](Self::reopen) can start a
    /// second engine over the same persisted image.
    pub fn memory_with(config: Config) -> Self {
        let store = Arc::new(CountingBlockStore::new(config.store_name.clone()));
        let engine = Engine::new(Arc::clone(&store), config);
        engine.ensure_ready().expect("Failed to start in-memory engine");
        Self {
            engine: Arc::new(engine),
            store: Some(store),
            _temp_dir: None,
        }
    }

    /// Creates an empty file-backed engine in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let engine =
            Engine::open(temp_dir.path(), Config::new()).expect("Failed to open file engine");
        Self {
            engine: Arc::new(engine),
            store: None,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Number of snapshots written so far, startup included.
    ///
    /// # Panics
    ///
    /// Panics for file-backed engines, which do not count writes.
    pub fn puts(&self) -> usize {
        self.store
            .as_ref()
            .expect("Only memory engines count writes")
            .puts()
    }

    /// Returns the store directory if file-backed, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }

    /// Returns an engine started from the persisted snapshot only.
    ///
    /// Memory engines get a second engine over the shared store. File engines
    /// hold the directory lock, so the same engine is closed and reloaded.
    pub fn reopen(&self) -> Arc<Engine> {
        match &self.store {
            Some(store) => {
                let engine = Engine::new(Arc::clone(store), self.engine.config().clone());
                engine.ensure_ready().expect("Failed to restart engine");
                Arc::new(engine)
            }
            None => {
                self.engine.close();
                self.engine.ensure_ready().expect("Failed to reload engine");
                Arc::clone(&self.engine)
            }
        }
    }

    /// A repository over this engine.
    pub fn repo(&self) -> Repository {
        Repository::new(Arc::clone(&self.engine))
    }

    /// A backup manager over this engine.
    pub fn backup(&self) -> BackupManager {
        BackupManager::new(Arc::clone(&self.engine))
    }
}

impl std::ops::Deref for TestEngine {
    type Target = Engine;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

/// A valid draft with one ingredient and one step.
pub fn sample_draft(title: &str) -> RecipeDraft {
    RecipeDraft::new(title)
        .ingredient(Ingredient::named("Salt"))
        .step("Season to taste")
}

/// Runs a test with a repository over a temporary in-memory engine.
///
/// # Example
///
/// ```rust,ignore
/// use recipebox_testkit::with_temp_repo;
///
/// #[test]
/// fn my_test() {
///     with_temp_repo(|repo| {
///         let recipe = repo.create(sample_draft("Soup")).unwrap();
///         // ... test operations
///     });
/// }
/// ```
pub fn with_temp_repo<F, R>(f: F) -> R
where
    F: FnOnce(&Repository) -> R,
{
    let test_engine = TestEngine::memory();
    f(&test_engine.repo())
}

/// Runs a test with a repository over a temporary file-backed engine.
pub fn with_file_repo<F, R>(f: F) -> R
where
    F: FnOnce(&Repository, &Path) -> R,
{
    let test_engine = TestEngine::file();
    let path = test_engine
        .path()
        .expect("File engine should have a path")
        .to_path_buf();
    f(&test_engine.repo(), &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates an engine holding `count` recipes titled `Recipe 0`, `Recipe 1`, ...
    ///
    /// Every recipe is tagged `even` or `odd` and rated `1 + i % 5`.
    pub fn populated_engine(count: usize) -> (TestEngine, Vec<Recipe>) {
        let test_engine = TestEngine::memory();
        let repo = test_engine.repo();
        let mut recipes = Vec::with_capacity(count);

        for i in 0..count {
            let parity = if i % 2 == 0 { "even" } else { "odd" };
            let rating = u8::try_from(1 + i % 5).expect("rating fits in u8");
            let draft = sample_draft(&format!("Recipe {i}"))
                .tag(parity)
                .rating(rating);
            recipes.push(repo.create(draft).expect("Failed to create recipe"));
        }

        (test_engine, recipes)
    }

    /// Creates an engine with a small, varied pantry.
    pub fn kitchen() -> (TestEngine, Vec<Recipe>) {
        let test_engine = TestEngine::memory();
        let repo = test_engine.repo();
        let drafts = [
            RecipeDraft::new("Tomato Soup")
                .ingredient(Ingredient::named("Tomato").with_amount(4.0, None))
                .ingredient(Ingredient::named("Onion"))
                .step("Simmer")
                .tag("soup")
                .tag("vegetarian")
                .rating(4),
            RecipeDraft::new("Chicken Curry")
                .ingredient(Ingredient::named("Chicken").with_amount(500.0, Some("g")))
                .ingredient(Ingredient::named("Onion"))
                .step("Brown the chicken")
                .step("Add spices")
                .tag("dinner")
                .rating(5),
            RecipeDraft::new("Green Salad")
                .ingredient(Ingredient::named("Lettuce"))
                .step("Toss")
                .tag("vegetarian"),
        ];

        let recipes = drafts
            .into_iter()
            .map(|d| repo.create(d).expect("Failed to create recipe"))
            .collect();
        (test_engine, recipes)
    }
}

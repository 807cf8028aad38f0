//! Backup and restore.
//!
//! Two independent pairs of operations:
//!
//! - **Binary image**: the complete database file. Full fidelity; importing
//!   replaces the live database wholesale.
//! - **Structured interchange**: a versioned JSON document (see
//!   [`crate::interchange`]). Merges into the live database record by record.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use recipebox_core::{BackupManager, ImportMode};
//!
//! let backup = BackupManager::new(engine.clone());
//!
//! // Binary
//! let image = backup.export_image()?;
//! std::fs::write("recipes.sqlite", &image)?;
//! backup.import_image(&std::fs::read("recipes.sqlite")?)?;
//!
//! // Structured
//! let json = backup.export_records_json()?;
//! let report = backup.import_records_json(&json, ImportMode::Overwrite)?;
//! ```

use crate::engine::{image, Engine};
use crate::error::{CoreError, CoreResult};
use crate::interchange::{self, ExportDocument, ImportMode, ImportReport};
use crate::migration::{self, MigrationReport, COLUMN_MIGRATIONS};
use crate::schema::{self, RECIPES_TABLE};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Facts about a binary image, gathered without installing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    /// Size of the image in bytes.
    pub size: usize,
    /// `PRAGMA user_version` stored in the image.
    pub schema_version: u32,
    /// Number of recipes in the image.
    pub recipe_count: u64,
    /// Columns that would be added by migration on import.
    pub pending_columns: Vec<&'static str>,
    /// Whether SQLite's quick integrity check passed.
    pub integrity_ok: bool,
}

/// Export and import of whole databases.
#[derive(Debug, Clone)]
pub struct BackupManager {
    engine: Arc<Engine>,
}

impl BackupManager {
    /// Creates a backup manager for `engine`.
    #[must_use]
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Returns the complete binary image of the live database.
    pub fn export_image(&self) -> CoreResult<Vec<u8>> {
        let bytes = self.engine.export_image()?;
        info!(bytes = bytes.len(), "database image exported");
        Ok(bytes)
    }

    /// Replaces the live database with `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IncompatibleImage`] if the image is not a recipe
    /// database; the live database is unchanged in that case.
    pub fn import_image(&self, bytes: &[u8]) -> CoreResult<MigrationReport> {
        self.engine.install_image(bytes)
    }

    /// Opens `bytes` on the side and reports what it holds. No live database
    /// is involved.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IncompatibleImage`] for the same images
    /// [`import_image`](Self::import_image) would reject.
    pub fn inspect_image(bytes: &[u8]) -> CoreResult<ImageInfo> {
        let conn = image::open(bytes)
            .and_then(|conn| schema::probe(&conn).map(|()| conn))
            .map_err(|e| CoreError::incompatible_image(e.to_string()))?;

        let check: String = conn.query_row("PRAGMA quick_check", [], |row| row.get(0))?;
        let recipe_count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {RECIPES_TABLE}"), [], |row| {
                row.get(0)
            })?;
        let columns = migration::existing_columns(&conn, RECIPES_TABLE)?;
        let pending_columns = COLUMN_MIGRATIONS
            .iter()
            .map(|m| m.column)
            .filter(|column| !columns.iter().any(|c| c == column))
            .collect();

        Ok(ImageInfo {
            size: bytes.len(),
            schema_version: schema::user_version(&conn)?,
            recipe_count: u64::try_from(recipe_count).unwrap_or_default(),
            pending_columns,
            integrity_ok: check == "ok",
        })
    }

    /// Exports every recipe as an interchange document.
    pub fn export_records(&self) -> CoreResult<ExportDocument> {
        self.engine.read(interchange::export_from)
    }

    /// Exports every recipe as pretty-printed interchange JSON.
    pub fn export_records_json(&self) -> CoreResult<String> {
        let document = self.export_records()?;
        info!(recipes = document.recipes.len(), "recipes exported");
        document.to_json_pretty()
    }

    /// Imports already-parsed recipe objects, persisting once at the end.
    pub fn import_records(&self, items: &[Value], mode: ImportMode) -> CoreResult<ImportReport> {
        let report = self
            .engine
            .write(|tx| interchange::import_batch(tx, items, mode))?;
        info!(
            imported = report.imported,
            skipped = report.skipped,
            failed = report.errors.len(),
            %mode,
            "recipes imported"
        );
        Ok(report)
    }

    /// Parses and imports an interchange document.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDocument`] if the text is not a document;
    /// nothing is written in that case. Problems with individual recipes are
    /// reported in [`ImportReport::errors`] instead.
    pub fn import_records_json(&self, text: &str, mode: ImportMode) -> CoreResult<ImportReport> {
        let items = interchange::parse_document(text)?;
        self.import_records(&items, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::id::RecipeId;
    use crate::migration::LEGACY_TABLE;
    use crate::repository::Repository;
    use crate::types::{Ingredient, RecipeDraft};
    use recipebox_storage::InMemoryBlockStore;
    use rusqlite::Connection;
    use serde_json::json;

    fn setup(config: Config) -> (Repository, BackupManager) {
        let engine = Arc::new(Engine::open_in_memory(config).unwrap());
        (Repository::new(Arc::clone(&engine)), BackupManager::new(engine))
    }

    fn draft(title: &str) -> RecipeDraft {
        RecipeDraft::new(title)
            .ingredient(Ingredient::named("Salt"))
            .step("Season")
    }

    fn item(id: &str, title: &str) -> Value {
        json!({"id": id, "title": title, "ingredients": [{"name": "x"}], "steps": ["y"]})
    }

    #[test]
    fn image_roundtrip_between_engines() {
        let (repo, backup) = setup(Config::new());
        let created = repo.create(draft("Soup").rating(4)).unwrap();
        let bytes = backup.export_image().unwrap();

        let (other_repo, other_backup) = setup(Config::new().with_sample_recipes());
        other_backup.import_image(&bytes).unwrap();

        assert_eq!(other_repo.count().unwrap(), 1);
        assert_eq!(other_repo.get_by_id(&created.id).unwrap(), Some(created));
    }

    #[test]
    fn incompatible_image_is_rejected_and_live_data_kept() {
        let (repo, backup) = setup(Config::new().with_sample_recipes());
        let foreign = Connection::open_in_memory().unwrap();
        foreign.execute_batch("CREATE TABLE notes (body TEXT)").unwrap();
        let foreign = image::export(&foreign).unwrap();

        for bytes in [&foreign[..], b"garbage".as_slice()] {
            assert!(matches!(
                backup.import_image(bytes),
                Err(CoreError::IncompatibleImage { .. })
            ));
            assert_eq!(repo.count().unwrap(), 3);
        }
    }

    #[test]
    fn legacy_image_is_migrated_on_import() {
        let legacy = Connection::open_in_memory().unwrap();
        legacy.execute_batch(LEGACY_TABLE).unwrap();
        legacy
            .execute(
                "INSERT INTO recipes (id, title, ingredients, steps, created_at, updated_at) \
                 VALUES ('old', 'Old', '[{\"name\":\"x\"}]', '[\"y\"]', 't1', 't2')",
                [],
            )
            .unwrap();
        let bytes = image::export(&legacy).unwrap();

        let (repo, backup) = setup(Config::new());
        let info = BackupManager::inspect_image(&bytes).unwrap();
        assert_eq!(info.pending_columns, vec!["rating"]);
        assert_eq!(info.recipe_count, 1);

        let report = backup.import_image(&bytes).unwrap();
        assert_eq!(report.applied_count(), 1);
        let old = repo.get_by_id(&RecipeId::from("old")).unwrap().unwrap();
        assert_eq!(old.rating, None);
        assert_eq!(old.servings, 4);
    }

    #[test]
    fn inspect_reports_current_image() {
        let (repo, backup) = setup(Config::new());
        repo.create(draft("A")).unwrap();
        repo.create(draft("B")).unwrap();
        let bytes = backup.export_image().unwrap();

        let info = BackupManager::inspect_image(&bytes).unwrap();
        assert_eq!(info.size, bytes.len());
        assert_eq!(info.recipe_count, 2);
        assert_eq!(info.schema_version, schema::SCHEMA_VERSION);
        assert!(info.pending_columns.is_empty());
        assert!(info.integrity_ok);

        assert!(matches!(
            BackupManager::inspect_image(b"nope"),
            Err(CoreError::IncompatibleImage { .. })
        ));
    }

    #[test]
    fn structured_roundtrip() {
        let (repo, backup) = setup(Config::new());
        let created = repo.create(draft("Soup").tag("dinner").rating(3)).unwrap();
        let json = backup.export_records_json().unwrap();

        let (other_repo, other_backup) = setup(Config::new());
        let report = other_backup.import_records_json(&json, ImportMode::Skip).unwrap();
        assert_eq!(report, ImportReport { imported: 1, skipped: 0, errors: vec![] });
        assert_eq!(other_repo.get_by_id(&created.id).unwrap(), Some(created));
    }

    #[test]
    fn skip_leaves_existing_record() {
        let (repo, backup) = setup(Config::new());
        backup.import_records(&[item("r1", "Original")], ImportMode::Skip).unwrap();

        let report = backup
            .import_records(&[item("r1", "Replacement")], ImportMode::Skip)
            .unwrap();
        assert_eq!((report.imported, report.skipped), (0, 1));
        let stored = repo.get_by_id(&RecipeId::from("r1")).unwrap().unwrap();
        assert_eq!(stored.title, "Original");
    }

    #[test]
    fn overwrite_replaces_existing_record() {
        let (repo, backup) = setup(Config::new());
        backup.import_records(&[item("r1", "Original")], ImportMode::Skip).unwrap();

        let report = backup
            .import_records(&[item("r1", "Replacement")], ImportMode::Overwrite)
            .unwrap();
        assert_eq!((report.imported, report.skipped), (1, 0));
        let stored = repo.get_by_id(&RecipeId::from("r1")).unwrap().unwrap();
        assert_eq!(stored.title, "Replacement");
    }

    #[test]
    fn partial_failure_does_not_abort() {
        let (repo, backup) = setup(Config::new());
        let document = json!({
            "version": 1,
            "recipes": [
                item("a", "A"),
                item("b", "B"),
                {"id": "c", "title": "C", "ingredients": [{"name": "x"}]},
                item("d", "D"),
            ]
        });
        let report = backup
            .import_records_json(&document.to_string(), ImportMode::Skip)
            .unwrap();
        assert_eq!(report.imported, 3);
        assert_eq!(report.errors, vec!["Recipe \"C\" missing steps".to_string()]);
        assert_eq!(repo.count().unwrap(), 3);
    }

    #[test]
    fn malformed_document_writes_nothing() {
        let store = Arc::new(InMemoryBlockStore::new("kitchen"));
        let engine = Engine::new(Arc::clone(&store), Config::new());
        engine.ensure_ready().unwrap();
        let backup = BackupManager::new(Arc::new(engine));
        let before = store.data("data").unwrap();

        for text in ["not json", r#"{"recipes": "many"}"#] {
            assert!(matches!(
                backup.import_records_json(text, ImportMode::Skip),
                Err(CoreError::InvalidDocument { .. })
            ));
        }
        assert_eq!(store.data("data").unwrap(), before);
    }

    #[test]
    fn import_persists_once() {
        let store = Arc::new(InMemoryBlockStore::new("kitchen"));
        let engine = Arc::new(Engine::new(Arc::clone(&store), Config::new()));
        engine.ensure_ready().unwrap();
        let backup = BackupManager::new(Arc::clone(&engine));

        let items: Vec<_> = (0..10).map(|i| item(&format!("r{i}"), "T")).collect();
        backup.import_records(&items, ImportMode::Skip).unwrap();

        // What is stored is exactly the current image, batch included.
        let stored = store.data("data").unwrap();
        let reopened = Engine::new(InMemoryBlockStore::with_entry("copy", "data", stored), Config::new());
        reopened.ensure_ready().unwrap();
        let repo = Repository::new(Arc::new(reopened));
        assert_eq!(repo.count().unwrap(), 10);
    }
}

//! Schema migration support.
//!
//! Migrations in recipebox are:
//! - **Additive-only**: each one adds a nullable column to `recipes`
//! - **Forward-only**: there is no rollback (use a binary backup instead)
//! - **Idempotent**: a migration whose column already exists is skipped, so
//!   running the whole set against a migrated image does nothing
//!
//! Column presence is read from `PRAGMA table_info`, never from the stored
//! `user_version`, so images written by any earlier release are handled.

use crate::error::CoreResult;
use crate::schema::{RECIPES_TABLE, SCHEMA_VERSION};
use rusqlite::Connection;
use tracing::info;

/// An additive column migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMigration {
    /// Schema version that introduced the column.
    pub version: u32,
    /// Column name.
    pub column: &'static str,
    /// Column type; the column is always added with a NULL default.
    pub definition: &'static str,
}

/// Every column added after the first release, oldest first.
pub const COLUMN_MIGRATIONS: &[ColumnMigration] = &[ColumnMigration {
    version: 2,
    column: "rating",
    definition: "INTEGER",
}];

/// Result of running the pending migrations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Migrations that were applied, in order.
    pub applied: Vec<ColumnMigration>,
}

impl MigrationReport {
    /// Returns true if nothing had to change.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }

    /// Number of migrations applied.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

/// Lists the live column names of `table`.
pub fn existing_columns(conn: &Connection, table: &str) -> CoreResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{table}\")"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Adds every missing column to `recipes`.
///
/// The caller is responsible for persisting the image when the report is
/// not a no-op.
pub fn run_pending(conn: &Connection) -> CoreResult<MigrationReport> {
    let columns = existing_columns(conn, RECIPES_TABLE)?;
    let mut report = MigrationReport::default();

    for migration in COLUMN_MIGRATIONS {
        if columns.iter().any(|c| c == migration.column) {
            continue;
        }
        info!(
            version = migration.version,
            column = migration.column,
            "running migration: adding column"
        );
        conn.execute_batch(&format!(
            "ALTER TABLE {RECIPES_TABLE} ADD COLUMN {} {}",
            migration.column, migration.definition
        ))?;
        report.applied.push(*migration);
    }

    if !report.is_noop() {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    Ok(report)
}

/// The table as shipped by the first release, before `rating` existed.
#[cfg(test)]
pub(crate) const LEGACY_TABLE: &str = "
    CREATE TABLE recipes (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        photos TEXT DEFAULT '[]',
        servings INTEGER DEFAULT 4,
        prep_time INTEGER,
        cook_time INTEGER,
        ingredients TEXT NOT NULL DEFAULT '[]',
        steps TEXT NOT NULL DEFAULT '[]',
        notes TEXT,
        tags TEXT DEFAULT '[]',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )";

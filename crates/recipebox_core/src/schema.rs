//! Declarative schema of the `recipes` relation.
//!
//! Nested fields (`photos`, `ingredients`, `steps`, `tags`) are stored as
//! JSON text. Columns added after the first release are listed in
//! [`crate::migration`] and are also part of the full definition below, so a
//! fresh store starts at [`SCHEMA_VERSION`].

use crate::error::CoreResult;
use rusqlite::Connection;

/// Name of the only persisted relation.
pub const RECIPES_TABLE: &str = "recipes";

/// Schema version written to `PRAGMA user_version`.
pub const SCHEMA_VERSION: u32 = 2;

/// Full definition of the `recipes` relation.
pub const CREATE_RECIPES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS recipes (
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
    updated_at TEXT NOT NULL,
    rating INTEGER
)";

/// Index backing title lookups and title ordering.
pub const CREATE_TITLE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_recipes_title ON recipes(title)";

/// Every schema statement, in application order.
pub const ALL_SCHEMAS: &[&str] = &[CREATE_RECIPES_TABLE, CREATE_TITLE_INDEX];

/// Columns present since the first release. Images lacking any of these are
/// incompatible; later columns are added by migration instead.
pub const BASE_COLUMNS: &[&str] = &[
    "id",
    "title",
    "description",
    "photos",
    "servings",
    "prep_time",
    "cook_time",
    "ingredients",
    "steps",
    "notes",
    "tags",
    "created_at",
    "updated_at",
];

/// Column list read by the record mapper, in [`crate::mapper::RecipeRow`] order.
pub const RECIPE_COLUMNS: &str = "id, title, description, photos, servings, prep_time, \
     cook_time, ingredients, steps, notes, tags, rating, created_at, updated_at";

/// Applies the full schema to an empty connection.
pub fn apply(conn: &Connection) -> CoreResult<()> {
    for statement in ALL_SCHEMAS {
        conn.execute_batch(statement)?;
    }
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Runs the compatibility probe: a trivial read of every base column.
///
/// # Errors
///
/// Returns the engine error if the relation or any base column is missing,
/// or the image cannot be read at all.
pub fn probe(conn: &Connection) -> CoreResult<()> {
    let sql = format!(
        "SELECT {} FROM {RECIPES_TABLE} LIMIT 1",
        BASE_COLUMNS.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    rows.next()?;
    Ok(())
}

/// Reads `PRAGMA user_version`.
pub fn user_version(conn: &Connection) -> CoreResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

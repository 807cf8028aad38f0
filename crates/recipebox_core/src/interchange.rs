//! Structured JSON interchange.
//!
//! Exported documents look like `{"version": 1, "recipes": [...]}` with one
//! object per stored row: snake_case column names, nested fields decoded to
//! JSON values, explicit `null`s. Imports accept that shape or a bare array,
//! and read both snake_case and camelCase spellings of the multi-word fields.
//!
//! Import problems are reported per recipe; only an unparseable document or
//! one without a recipe list fails as a whole.

use crate::error::{CoreError, CoreResult};
use crate::id::RecipeId;
use crate::mapper::RecipeRow;
use crate::schema::{RECIPES_TABLE, RECIPE_COLUMNS};
use crate::types::{now_timestamp, Ingredient, Recipe, DEFAULT_SERVINGS};
use rusqlite::{Connection, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Version written to exported documents.
pub const EXPORT_VERSION: u32 = 1;

/// What to do with an imported recipe whose `id` is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Keep the stored recipe and count the incoming one as skipped.
    #[default]
    Skip,
    /// Replace the stored recipe.
    Overwrite,
}

/// Error parsing an [`ImportMode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown import mode {0:?} (expected \"skip\" or \"overwrite\")")]
pub struct ParseImportModeError(String);

impl FromStr for ImportMode {
    type Err = ParseImportModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Self::Skip),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(ParseImportModeError(other.to_string())),
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
        })
    }
}

/// Outcome of a structured import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Recipes written.
    pub imported: usize,
    /// Recipes left alone because their id already existed.
    pub skipped: usize,
    /// One message per recipe that could not be imported.
    pub errors: Vec<String>,
}

/// An exported document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument {
    /// Format version, always [`EXPORT_VERSION`].
    pub version: u32,
    /// Every stored recipe.
    pub recipes: Vec<ExportRecord>,
}

impl ExportDocument {
    /// Renders the document as JSON indented by two spaces.
    pub fn to_json_pretty(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One exported row, keyed by column name.
///
/// Scalar columns are copied as stored; nested columns are decoded so the
/// document holds real arrays rather than JSON text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    /// `id`
    pub id: String,
    /// `title`
    pub title: String,
    /// `description`
    pub description: Option<String>,
    /// `photos`, decoded.
    pub photos: Value,
    /// `servings`
    pub servings: Option<i64>,
    /// `prep_time`
    pub prep_time: Option<i64>,
    /// `cook_time`
    pub cook_time: Option<i64>,
    /// `ingredients`, decoded.
    pub ingredients: Value,
    /// `steps`, decoded.
    pub steps: Value,
    /// `notes`
    pub notes: Option<String>,
    /// `tags`, decoded.
    pub tags: Value,
    /// `rating`
    pub rating: Option<i64>,
    /// `created_at`
    pub created_at: String,
    /// `updated_at`
    pub updated_at: String,
}

impl TryFrom<RecipeRow> for ExportRecord {
    type Error = CoreError;

    fn try_from(row: RecipeRow) -> CoreResult<Self> {
        Ok(Self {
            photos: nested("photos", row.photos.as_deref())?,
            ingredients: nested("ingredients", row.ingredients.as_deref())?,
            steps: nested("steps", row.steps.as_deref())?,
            tags: nested("tags", row.tags.as_deref())?,
            id: row.id,
            title: row.title,
            description: row.description,
            servings: row.servings,
            prep_time: row.prep_time,
            cook_time: row.cook_time,
            notes: row.notes,
            rating: row.rating,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn nested(column: &'static str, text: Option<&str>) -> CoreResult<Value> {
    match text {
        Some(t) if !t.trim().is_empty() => {
            serde_json::from_str(t).map_err(|e| CoreError::invalid_row(column, e.to_string()))
        }
        _ => Ok(Value::Array(Vec::new())),
    }
}

/// Reads every stored row, in insertion order.
pub fn export_from(conn: &Connection) -> CoreResult<ExportDocument> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECIPE_COLUMNS} FROM {RECIPES_TABLE} ORDER BY rowid"
    ))?;
    let recipes = stmt
        .query_map([], RecipeRow::from_row)?
        .map(|row| ExportRecord::try_from(row?))
        .collect::<CoreResult<Vec<_>>>()?;
    Ok(ExportDocument {
        version: EXPORT_VERSION,
        recipes,
    })
}

/// Extracts the recipe list from an interchange document.
///
/// # Errors
///
/// Returns [`CoreError::InvalidDocument`] if `text` is not JSON, or is
/// neither an array nor an object whose `recipes` field is an array.
pub fn parse_document(text: &str) -> CoreResult<Vec<Value>> {
    let document: Value = serde_json::from_str(text)
        .map_err(|e| CoreError::invalid_document(format!("Invalid JSON format: {e}")))?;
    match document {
        Value::Array(items) => Ok(items),
        Value::Object(mut fields) => match fields.remove("recipes") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(expected_array()),
        },
        _ => Err(expected_array()),
    }
}

fn expected_array() -> CoreError {
    CoreError::invalid_document("Invalid format: expected an array of recipes")
}

/// A recipe as it may appear in an imported document.
#[derive(Debug, Deserialize)]
struct ImportedRecipe {
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    photos: Option<Vec<String>>,
    #[serde(default)]
    servings: Option<u32>,
    #[serde(default)]
    prep_time: Option<u32>,
    #[serde(default, rename = "prepTime")]
    prep_time_camel: Option<u32>,
    #[serde(default)]
    cook_time: Option<u32>,
    #[serde(default, rename = "cookTime")]
    cook_time_camel: Option<u32>,
    ingredients: Vec<Ingredient>,
    steps: Vec<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    rating: Option<u8>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default, rename = "createdAt")]
    created_at_camel: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default, rename = "updatedAt")]
    updated_at_camel: Option<String>,
}

impl ImportedRecipe {
    /// Applies the import defaults. The id is resolved by the caller.
    fn into_recipe(self, id: RecipeId, now: &str) -> Recipe {
        Recipe {
            id,
            title: self.title,
            description: self.description.filter(|d| !d.is_empty()),
            photos: self.photos.unwrap_or_default(),
            servings: self.servings.filter(|s| *s > 0).unwrap_or(DEFAULT_SERVINGS),
            prep_time: self.prep_time.or(self.prep_time_camel),
            cook_time: self.cook_time.or(self.cook_time_camel),
            ingredients: self.ingredients,
            steps: self.steps,
            notes: self.notes.filter(|n| !n.is_empty()),
            tags: self.tags.unwrap_or_default(),
            rating: self.rating.filter(|r| *r > 0),
            created_at: self
                .created_at
                .or(self.created_at_camel)
                .unwrap_or_else(|| now.to_string()),
            updated_at: self
                .updated_at
                .or(self.updated_at_camel)
                .unwrap_or_else(|| now.to_string()),
        }
    }
}

enum Outcome {
    Imported,
    Skipped,
}

/// Imports `items` in one transaction, recording per-recipe failures.
///
/// Each recipe is applied atomically: a failed overwrite keeps the stored
/// recipe it was meant to replace.
pub fn import_into(
    conn: &mut Connection,
    items: &[Value],
    mode: ImportMode,
) -> CoreResult<ImportReport> {
    let mut tx = conn.transaction()?;
    let report = import_batch(&mut tx, items, mode)?;
    tx.commit()?;
    Ok(report)
}

/// Imports `items` inside a transaction the caller commits.
pub fn import_batch(
    tx: &mut Transaction<'_>,
    items: &[Value],
    mode: ImportMode,
) -> CoreResult<ImportReport> {
    let mut report = ImportReport::default();
    let now = now_timestamp();

    for item in items {
        match import_one(tx, item, mode, &now) {
            Ok(Outcome::Imported) => report.imported += 1,
            Ok(Outcome::Skipped) => report.skipped += 1,
            Err(message) => report.errors.push(message),
        }
    }

    debug!(
        imported = report.imported,
        skipped = report.skipped,
        failed = report.errors.len(),
        %mode,
        "import finished"
    );
    Ok(report)
}

/// Checks the fields every importable recipe must carry, returning its title.
fn required_title(item: &Value) -> Result<&str, String> {
    let title = item
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "Recipe missing title".to_string())?;

    let non_empty = |field: &str| {
        item.get(field)
            .and_then(Value::as_array)
            .is_some_and(|list| !list.is_empty())
    };
    if !non_empty("ingredients") {
        return Err(format!("Recipe \"{title}\" missing ingredients"));
    }
    if !non_empty("steps") {
        return Err(format!("Recipe \"{title}\" missing steps"));
    }
    Ok(title)
}

fn import_one(
    tx: &mut Transaction<'_>,
    item: &Value,
    mode: ImportMode,
    now: &str,
) -> Result<Outcome, String> {
    let title = required_title(item)?;
    let failed = |e: &dyn fmt::Display| format!("Failed to import \"{title}\": {e}");

    let imported = ImportedRecipe::deserialize(item).map_err(|e| failed(&e))?;
    let given_id = imported.id.clone().filter(|id| !id.is_empty());

    let sp = tx.savepoint().map_err(|e| failed(&e))?;
    if let Some(id) = given_id.as_deref() {
        let exists = sp
            .query_row(
                &format!("SELECT 1 FROM {RECIPES_TABLE} WHERE id = ?1"),
                [id],
                |_| Ok(()),
            )
            .optional()
            .map_err(|e| failed(&e))?
            .is_some();
        if exists {
            if mode == ImportMode::Skip {
                return Ok(Outcome::Skipped);
            }
            sp.execute(&format!("DELETE FROM {RECIPES_TABLE} WHERE id = ?1"), [id])
                .map_err(|e| failed(&e))?;
        }
    }

    let id = given_id.map_or_else(RecipeId::new, RecipeId::from);
    let row = RecipeRow::encode(&imported.into_recipe(id, now)).map_err(|e| failed(&e))?;
    row.insert(&sp).map_err(|e| failed(&e))?;
    sp.commit().map_err(|e| failed(&e))?;
    Ok(Outcome::Imported)
}

//! Record mapper: flat relational rows to and from [`Recipe`] entities.
//!
//! [`RecipeRow`] mirrors the `recipes` columns one to one with the types the
//! engine actually stores. Decoding is total: every column is read, nested
//! JSON text falls back to an empty list when absent or empty, `servings`
//! falls back to [`DEFAULT_SERVINGS`], and integers that do not fit the entity
//! types are reported as [`CoreError::InvalidRow`].

use crate::error::{CoreError, CoreResult};
use crate::id::RecipeId;
use crate::schema::RECIPES_TABLE;
use crate::types::{Recipe, DEFAULT_SERVINGS};
use rusqlite::{params, Connection, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// One row of the `recipes` relation, as stored.
///
/// Field order matches [`crate::schema::RECIPE_COLUMNS`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeRow {
    /// `id TEXT PRIMARY KEY`
    pub id: String,
    /// `title TEXT NOT NULL`
    pub title: String,
    /// `description TEXT`
    pub description: Option<String>,
    /// `photos TEXT` (JSON array of strings)
    pub photos: Option<String>,
    /// `servings INTEGER`
    pub servings: Option<i64>,
    /// `prep_time INTEGER`
    pub prep_time: Option<i64>,
    /// `cook_time INTEGER`
    pub cook_time: Option<i64>,
    /// `ingredients TEXT` (JSON array of objects)
    pub ingredients: Option<String>,
    /// `steps TEXT` (JSON array of strings)
    pub steps: Option<String>,
    /// `notes TEXT`
    pub notes: Option<String>,
    /// `tags TEXT` (JSON array of strings)
    pub tags: Option<String>,
    /// `rating INTEGER`
    pub rating: Option<i64>,
    /// `created_at TEXT NOT NULL`
    pub created_at: String,
    /// `updated_at TEXT NOT NULL`
    pub updated_at: String,
}

impl RecipeRow {
    /// Reads a row selected with [`crate::schema::RECIPE_COLUMNS`].
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            photos: row.get(3)?,
            servings: row.get(4)?,
            prep_time: row.get(5)?,
            cook_time: row.get(6)?,
            ingredients: row.get(7)?,
            steps: row.get(8)?,
            notes: row.get(9)?,
            tags: row.get(10)?,
            rating: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    /// Inserts this row. Fails on a duplicate `id`.
    pub fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO {RECIPES_TABLE} (id, title, description, photos, servings, prep_time, \
                 cook_time, ingredients, steps, notes, tags, rating, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                self.id,
                self.title,
                self.description,
                self.photos,
                self.servings,
                self.prep_time,
                self.cook_time,
                self.ingredients,
                self.steps,
                self.notes,
                self.tags,
                self.rating,
                self.created_at,
                self.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Rewrites every column except `id` and `created_at` of the row with
    /// this `id`. Returns the number of rows changed (0 or 1).
    pub fn update(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            &format!(
                "UPDATE {RECIPES_TABLE} SET title = ?2, description = ?3, photos = ?4, \
                 servings = ?5, prep_time = ?6, cook_time = ?7, ingredients = ?8, steps = ?9, \
                 notes = ?10, tags = ?11, rating = ?12, updated_at = ?13 WHERE id = ?1"
            ),
            params![
                self.id,
                self.title,
                self.description,
                self.photos,
                self.servings,
                self.prep_time,
                self.cook_time,
                self.ingredients,
                self.steps,
                self.notes,
                self.tags,
                self.rating,
                self.updated_at,
            ],
        )
    }

    /// Encodes an entity into its stored form.
    pub fn encode(recipe: &Recipe) -> CoreResult<Self> {
        Ok(Self {
            id: recipe.id.as_str().to_string(),
            title: recipe.title.clone(),
            description: recipe.description.clone(),
            photos: Some(encode_json(&recipe.photos)?),
            servings: Some(i64::from(recipe.servings)),
            prep_time: recipe.prep_time.map(i64::from),
            cook_time: recipe.cook_time.map(i64::from),
            ingredients: Some(encode_json(&recipe.ingredients)?),
            steps: Some(encode_json(&recipe.steps)?),
            notes: recipe.notes.clone(),
            tags: Some(encode_json(&recipe.tags)?),
            rating: recipe.rating.map(i64::from),
            created_at: recipe.created_at.clone(),
            updated_at: recipe.updated_at.clone(),
        })
    }

    /// Decodes the stored form back into an entity.
    pub fn decode(self) -> CoreResult<Recipe> {
        let servings = match narrow::<u32>("servings", self.servings)? {
            None | Some(0) => DEFAULT_SERVINGS,
            Some(n) => n,
        };

        Ok(Recipe {
            id: RecipeId::from(self.id),
            title: self.title,
            description: self.description,
            photos: decode_list("photos", self.photos.as_deref())?,
            servings,
            prep_time: narrow("prep_time", self.prep_time)?,
            cook_time: narrow("cook_time", self.cook_time)?,
            ingredients: decode_list("ingredients", self.ingredients.as_deref())?,
            steps: decode_list("steps", self.steps.as_deref())?,
            notes: self.notes,
            tags: decode_list("tags", self.tags.as_deref())?,
            rating: narrow("rating", self.rating)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Serializes a nested field to compact JSON text.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> CoreResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn decode_list<T: DeserializeOwned>(column: &'static str, text: Option<&str>) -> CoreResult<Vec<T>> {
    match text {
        None => Ok(Vec::new()),
        Some(t) if t.trim().is_empty() => Ok(Vec::new()),
        Some(t) => serde_json::from_str(t).map_err(|e| CoreError::invalid_row(column, e.to_string())),
    }
}

fn narrow<T: TryFrom<i64>>(column: &'static str, value: Option<i64>) -> CoreResult<Option<T>> {
    value
        .map(|v| T::try_from(v).map_err(|_| CoreError::invalid_row(column, format!("{v} is out of range"))))
        .transpose()
}

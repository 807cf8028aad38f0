//! Recipe repository: CRUD, search and the tag/ingredient vocabularies.
//!
//! Every mutation persists the engine image before it returns. Lookups of
//! unknown ids are not errors: they come back as `None` or `false`.

use crate::engine::Engine;
use crate::error::CoreResult;
use crate::id::RecipeId;
use crate::mapper::RecipeRow;
use crate::schema::{RECIPES_TABLE, RECIPE_COLUMNS};
use crate::search::SearchParams;
use crate::types::{now_timestamp, Ingredient, Recipe, RecipeDraft, RecipePatch};
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Typed access to the `recipes` relation.
#[derive(Debug, Clone)]
pub struct Repository {
    engine: Arc<Engine>,
}

impl Repository {
    /// Creates a repository over a started engine.
    #[must_use]
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Returns the underlying engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Stores a new recipe under a fresh id and returns it.
    ///
    /// The draft is stored as given; run [`RecipeDraft::validate`] first to
    /// enforce the form rules.
    pub fn create(&self, draft: RecipeDraft) -> CoreResult<Recipe> {
        let now = now_timestamp();
        let recipe = normalized(Recipe::from_draft(RecipeId::new(), draft, &now));
        let row = RecipeRow::encode(&recipe)?;

        self.engine.write(|conn| Ok(row.insert(conn)?))?;
        info!(id = %recipe.id, title = %recipe.title, "recipe created");
        Ok(recipe)
    }

    /// Looks up one recipe.
    pub fn get_by_id(&self, id: &RecipeId) -> CoreResult<Option<Recipe>> {
        self.engine.read(|conn| find(conn, id))
    }

    /// Runs a filtered, sorted scan. See [`SearchParams`] for the matching rules.
    pub fn search(&self, params: &SearchParams) -> CoreResult<Vec<Recipe>> {
        let query = params.to_query();
        debug!(sql = %query.sql, params = query.params.len(), "search");

        self.engine.read(|conn| {
            let mut stmt = conn.prepare(&query.sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(query.params.iter()), RecipeRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(RecipeRow::decode).collect()
        })
    }

    /// Returns every recipe, most recently changed first.
    pub fn list(&self) -> CoreResult<Vec<Recipe>> {
        self.search(&SearchParams::new())
    }

    /// Merges `patch` over the stored recipe and stamps `updated_at`.
    ///
    /// Returns `None`, without persisting, if no recipe has this id.
    pub fn update(&self, id: &RecipeId, patch: RecipePatch) -> CoreResult<Option<Recipe>> {
        let updated = self.engine.mutate(|conn| {
            let Some(mut recipe) = find(conn, id)? else {
                return Ok(None);
            };
            recipe.apply(patch, &now_timestamp());
            let recipe = normalized(recipe);
            RecipeRow::encode(&recipe)?.update(conn)?;
            Ok(Some(recipe))
        })?;

        if let Some(recipe) = &updated {
            info!(id = %recipe.id, "recipe updated");
        }
        Ok(updated)
    }

    /// Removes a recipe. Returns false if it did not exist.
    pub fn delete(&self, id: &RecipeId) -> CoreResult<bool> {
        let deleted = self.engine.mutate(|conn| {
            let removed = conn.execute(
                &format!("DELETE FROM {RECIPES_TABLE} WHERE id = ?1"),
                [id.as_str()],
            )?;
            Ok((removed > 0).then_some(()))
        })?;

        if deleted.is_some() {
            info!(%id, "recipe deleted");
        }
        Ok(deleted.is_some())
    }

    /// Every tag in use, case-sensitive, sorted and deduplicated.
    pub fn list_tags(&self) -> CoreResult<Vec<String>> {
        self.engine.read(|conn| {
            let mut tags = BTreeSet::new();
            for recipe in decode_column::<String>(conn, "tags")? {
                tags.extend(recipe);
            }
            Ok(tags.into_iter().collect())
        })
    }

    /// Every ingredient name in use, lower-cased, sorted and deduplicated.
    pub fn list_ingredient_names(&self) -> CoreResult<Vec<String>> {
        self.engine.read(|conn| {
            let mut names = BTreeSet::new();
            for recipe in decode_column::<Ingredient>(conn, "ingredients")? {
                names.extend(recipe.into_iter().map(|i| i.name.to_lowercase()));
            }
            Ok(names.into_iter().collect())
        })
    }

    /// Number of stored recipes.
    pub fn count(&self) -> CoreResult<usize> {
        self.engine.read(|conn| {
            let n: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {RECIPES_TABLE}"),
                [],
                |row| row.get(0),
            )?;
            Ok(usize::try_from(n).unwrap_or_default())
        })
    }
}

fn find(conn: &Connection, id: &RecipeId) -> CoreResult<Option<Recipe>> {
    conn.query_row(
        &format!("SELECT {RECIPE_COLUMNS} FROM {RECIPES_TABLE} WHERE id = ?1"),
        [id.as_str()],
        RecipeRow::from_row,
    )
    .optional()?
    .map(RecipeRow::decode)
    .transpose()
}

/// Decodes one nested column of every row.
fn decode_column<T: serde::de::DeserializeOwned>(
    conn: &Connection,
    column: &'static str,
) -> CoreResult<Vec<Vec<T>>> {
    let mut stmt = conn.prepare(&format!("SELECT {column} FROM {RECIPES_TABLE}"))?;
    let texts = stmt
        .query_map([], |row| row.get::<_, Option<String>>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    texts
        .into_iter()
        .flatten()
        .filter(|text| !text.trim().is_empty())
        .map(|text| {
            serde_json::from_str(&text)
                .map_err(|e| crate::error::CoreError::invalid_row(column, e.to_string()))
        })
        .collect()
}

/// Stores empty text and zero amounts as absent, the way the form submits them.
fn normalized(mut recipe: Recipe) -> Recipe {
    recipe.description = recipe.description.filter(|d| !d.is_empty());
    recipe.notes = recipe.notes.filter(|n| !n.is_empty());
    recipe.prep_time = recipe.prep_time.filter(|t| *t > 0);
    recipe.cook_time = recipe.cook_time.filter(|t| *t > 0);
    recipe.rating = recipe.rating.filter(|r| *r > 0);
    recipe
}

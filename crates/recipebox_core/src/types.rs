//! Recipe entity and the form shapes used to create and edit it.

use crate::id::RecipeId;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Servings assumed when a record does not say.
pub const DEFAULT_SERVINGS: u32 = 4;

/// Returns the current time as an ISO-8601 UTC timestamp with millisecond precision.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn default_servings() -> u32 {
    DEFAULT_SERVINGS
}

/// Deserializes a present field (including an explicit `null`) as `Some(..)`.
///
/// Combined with `#[serde(default)]`, an absent field stays `None`, so
/// `Option<Option<T>>` can tell "leave unchanged" from "clear".
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// One line of a recipe's ingredient list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Ingredient name.
    pub name: String,
    /// Amount, e.g. `2` or `0.5`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    /// Unit of measure, e.g. `"cups"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Ingredient {
    /// Creates an ingredient with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: None,
            unit: None,
        }
    }

    /// Sets the quantity and unit.
    #[must_use]
    pub fn with_amount(mut self, quantity: f64, unit: Option<&str>) -> Self {
        self.quantity = Some(quantity);
        self.unit = unit.map(str::to_string);
        self
    }
}

/// A stored recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    /// Primary key, fixed at creation.
    pub id: RecipeId,
    /// Recipe name.
    pub title: String,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Image data URIs, in display order.
    #[serde(default)]
    pub photos: Vec<String>,
    /// Number of servings.
    pub servings: u32,
    /// Preparation time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<u32>,
    /// Cooking time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<u32>,
    /// Ingredient list.
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    /// Ordered preparation steps.
    #[serde(default)]
    pub steps: Vec<String>,
    /// Free-form tips or variations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Categories used for filtering.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Star rating, 0-5. `None` and `Some(0)` both mean unrated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// ISO-8601 timestamp of the last mutation.
    pub updated_at: String,
}

impl Recipe {
    /// Builds a new recipe from form data, stamping both timestamps with `now`.
    #[must_use]
    pub fn from_draft(id: RecipeId, draft: RecipeDraft, now: &str) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            photos: draft.photos,
            servings: draft.servings,
            prep_time: draft.prep_time,
            cook_time: draft.cook_time,
            ingredients: draft.ingredients,
            steps: draft.steps,
            notes: draft.notes,
            tags: draft.tags,
            rating: draft.rating,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    /// Merges the provided fields over this recipe and rewrites `updated_at`.
    ///
    /// `id` and `created_at` are never touched.
    pub fn apply(&mut self, patch: RecipePatch, now: &str) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(photos) = patch.photos {
            self.photos = photos;
        }
        if let Some(servings) = patch.servings {
            self.servings = servings;
        }
        if let Some(prep_time) = patch.prep_time {
            self.prep_time = prep_time;
        }
        if let Some(cook_time) = patch.cook_time {
            self.cook_time = cook_time;
        }
        if let Some(ingredients) = patch.ingredients {
            self.ingredients = ingredients;
        }
        if let Some(steps) = patch.steps {
            self.steps = steps;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(rating) = patch.rating {
            self.rating = rating;
        }
        self.updated_at = now.to_string();
    }

    /// Returns true if the recipe carries a nonzero rating.
    #[must_use]
    pub fn is_rated(&self) -> bool {
        self.rating.is_some_and(|r| r > 0)
    }
}

/// Form data for creating a recipe (everything except generated fields).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    /// Recipe name.
    pub title: String,
    /// Short summary.
    #[serde(default)]
    pub description: Option<String>,
    /// Image data URIs.
    #[serde(default)]
    pub photos: Vec<String>,
    /// Number of servings.
    #[serde(default = "default_servings")]
    pub servings: u32,
    /// Preparation time in minutes.
    #[serde(default)]
    pub prep_time: Option<u32>,
    /// Cooking time in minutes.
    #[serde(default)]
    pub cook_time: Option<u32>,
    /// Ingredient list.
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    /// Ordered preparation steps.
    #[serde(default)]
    pub steps: Vec<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Categories.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Star rating.
    #[serde(default)]
    pub rating: Option<u8>,
}

impl RecipeDraft {
    /// Creates a draft with a title and defaults for everything else.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            photos: Vec::new(),
            servings: DEFAULT_SERVINGS,
            prep_time: None,
            cook_time: None,
            ingredients: Vec::new(),
            steps: Vec::new(),
            notes: None,
            tags: Vec::new(),
            rating: None,
        }
    }

    /// Appends an ingredient.
    #[must_use]
    pub fn ingredient(mut self, ingredient: Ingredient) -> Self {
        self.ingredients.push(ingredient);
        self
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Appends a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Sets the rating.
    #[must_use]
    pub fn rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }
}

/// Partial form data for editing a recipe.
///
/// Absent fields are left unchanged. For nullable fields, `Some(None)`
/// (an explicit JSON `null`) clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipePatch {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New description, or `Some(None)` to clear it.
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    /// New photo list.
    #[serde(default)]
    pub photos: Option<Vec<String>>,
    /// New servings.
    #[serde(default)]
    pub servings: Option<u32>,
    /// New preparation time.
    #[serde(default, deserialize_with = "present")]
    pub prep_time: Option<Option<u32>>,
    /// New cooking time.
    #[serde(default, deserialize_with = "present")]
    pub cook_time: Option<Option<u32>>,
    /// New ingredient list.
    #[serde(default)]
    pub ingredients: Option<Vec<Ingredient>>,
    /// New steps.
    #[serde(default)]
    pub steps: Option<Vec<String>>,
    /// New notes.
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
    /// New tags.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// New rating.
    #[serde(default, deserialize_with = "present")]
    pub rating: Option<Option<u8>>,
}

impl RecipePatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets (or clears) the rating.
    #[must_use]
    pub fn rating(mut self, rating: Option<u8>) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Replaces the tags.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

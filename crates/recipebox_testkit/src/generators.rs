//! Property-based test generators using proptest.
//!
//! Strategies produce values that already satisfy the form rules and survive
//! the repository's normalization unchanged, so a created recipe can be
//! compared field by field with the draft it came from.

use proptest::prelude::*;
use recipebox_core::{
    Ingredient, RecipeDraft, RecipePatch, SearchParams, SortBy, SortOrder, MAX_PHOTOS, MAX_RATING,
};

/// Strategy for short human-readable words.
pub fn word_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][a-z]{1,9}").expect("Invalid regex")
}

/// Strategy for free text, including quotes, wildcards and non-ASCII.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9 %_\"'\\\\éñ]{0,39}").expect("Invalid regex")
}

/// Strategy for valid titles.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(word_strategy(), 1..4).prop_map(|words| words.join(" "))
}

/// Strategy for ingredients with optional amounts.
///
/// Quantities are quarter steps, which JSON carries exactly.
pub fn ingredient_strategy() -> impl Strategy<Value = Ingredient> {
    (
        word_strategy(),
        prop::option::of(0u32..400),
        prop::option::of(prop::sample::select(vec!["g", "kg", "cups", "tbsp", "tsp"])),
    )
        .prop_map(|(name, quarters, unit)| Ingredient {
            name,
            quantity: quarters.map(|q| f64::from(q) / 4.0),
            unit: unit.map(str::to_string),
        })
}

/// Strategy for a set of distinct lowercase tags.
pub fn tags_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(
        prop::string::string_regex("[a-z]{3,8}").expect("Invalid regex"),
        0..4,
    )
    .prop_map(|tags| tags.into_iter().collect())
}

/// Strategy for drafts that pass validation.
pub fn draft_strategy() -> impl Strategy<Value = RecipeDraft> {
    (
        (
            title_strategy(),
            prop::option::of(text_strategy()),
            prop::collection::vec("data:image/png;base64,[A-Za-z0-9]{4,12}", 0..=MAX_PHOTOS),
            1u32..13,
            prop::option::of(1u32..240),
            prop::option::of(1u32..240),
        ),
        (
            prop::collection::vec(ingredient_strategy(), 1..6),
            prop::collection::vec(text_strategy(), 1..5),
            prop::option::of(text_strategy()),
            tags_strategy(),
            prop::option::of(1..=MAX_RATING),
        ),
    )
        .prop_map(
            |(
                (title, description, photos, servings, prep_time, cook_time),
                (ingredients, steps, notes, tags, rating),
            )| RecipeDraft {
                title,
                description,
                photos,
                servings,
                prep_time,
                cook_time,
                ingredients,
                steps,
                notes,
                tags,
                rating,
            },
        )
}

/// Strategy for patches touching a random subset of fields.
pub fn patch_strategy() -> impl Strategy<Value = RecipePatch> {
    (
        prop::option::of(title_strategy()),
        prop::option::of(prop::option::of(text_strategy())),
        prop::option::of(1u32..13),
        prop::option::of(tags_strategy()),
        prop::option::of(prop::option::of(1..=MAX_RATING)),
    )
        .prop_map(|(title, description, servings, tags, rating)| RecipePatch {
            title,
            description,
            servings,
            tags,
            rating,
            ..RecipePatch::default()
        })
}

/// Strategy for sort settings.
pub fn sort_strategy() -> impl Strategy<Value = (SortBy, SortOrder)> {
    (
        prop_oneof![
            Just(SortBy::Title),
            Just(SortBy::CreatedAt),
            Just(SortBy::UpdatedAt),
            Just(SortBy::Rating),
        ],
        prop_oneof![Just(SortOrder::Asc), Just(SortOrder::Desc)],
    )
}

/// Strategy for search parameters, including out-of-range ratings.
pub fn search_params_strategy() -> impl Strategy<Value = SearchParams> {
    (
        prop::option::of(text_strategy()),
        tags_strategy(),
        prop::collection::vec(word_strategy(), 0..3),
        prop::option::of(0u8..8),
        sort_strategy(),
    )
        .prop_map(|(query, tags, ingredients, min_rating, (sort_by, sort_order))| {
            SearchParams {
                query,
                tags,
                ingredients,
                min_rating,
                sort_by,
                sort_order,
            }
        })
}

/// A repository operation for model-based tests.
///
/// Indices pick among the recipes created so far, modulo their count.
#[derive(Debug, Clone)]
pub enum RecipeOperation {
    /// Create a recipe
    Create(RecipeDraft),
    /// Update a recipe
    Update {
        /// Index of the target recipe
        index: usize,
        /// Fields to change
        patch: RecipePatch,
    },
    /// Delete a recipe
    Delete {
        /// Index of the target recipe
        index: usize,
    },
}

/// Strategy for repository operations.
pub fn recipe_operation_strategy() -> impl Strategy<Value = RecipeOperation> {
    prop_oneof![
        3 => draft_strategy().prop_map(RecipeOperation::Create),
        2 => (any::<usize>(), patch_strategy())
            .prop_map(|(index, patch)| RecipeOperation::Update { index, patch }),
        1 => any::<usize>().prop_map(|index| RecipeOperation::Delete { index }),
    ]
}

/// Strategy for a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<RecipeOperation>> {
    prop::collection::vec(recipe_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn drafts_pass_validation(draft in draft_strategy()) {
            let errors = draft.validate();
            prop_assert!(errors.is_empty(), "{:?}", errors);
        }

        #[test]
        fn tags_are_distinct(tags in tags_strategy()) {
            let mut sorted = tags.clone();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), tags.len());
        }

        #[test]
        fn quantities_are_quarter_steps(ingredient in ingredient_strategy()) {
            if let Some(q) = ingredient.quantity {
                prop_assert_eq!((q * 4.0).fract(), 0.0);
            }
        }
    }
}

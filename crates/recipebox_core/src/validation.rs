//! Form-level validation of recipe drafts.
//!
//! The repository stores whatever it is given; callers that accept user
//! input run [`RecipeDraft::validate`] first and refuse to save on errors.

use crate::types::RecipeDraft;
use serde::Serialize;
use std::fmt;

/// Maximum title length, in characters.
pub const MAX_TITLE_CHARS: usize = 200;
/// Maximum description length, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;
/// Maximum number of photos per recipe.
pub const MAX_PHOTOS: usize = 5;
/// Highest star rating.
pub const MAX_RATING: u8 = 5;

/// A problem with one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Field name, as used in the camelCase form shape.
    pub field: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl RecipeDraft {
    /// Checks the draft against the form rules; an empty result means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push(ValidationError::new("title", "Title is required"));
        } else if self.title.chars().count() > MAX_TITLE_CHARS {
            errors.push(ValidationError::new(
                "title",
                format!("Title must be {MAX_TITLE_CHARS} characters or less"),
            ));
        }

        if self
            .description
            .as_deref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_CHARS)
        {
            errors.push(ValidationError::new(
                "description",
                format!("Description must be {MAX_DESCRIPTION_CHARS} characters or less"),
            ));
        }

        if self.photos.len() > MAX_PHOTOS {
            errors.push(ValidationError::new(
                "photos",
                format!("At most {MAX_PHOTOS} photos are allowed"),
            ));
        }

        if self.servings == 0 {
            errors.push(ValidationError::new("servings", "Servings must be at least 1"));
        }

        if !self.ingredients.iter().any(|i| !i.name.trim().is_empty()) {
            errors.push(ValidationError::new(
                "ingredients",
                "At least one ingredient is required",
            ));
        }

        if !self.steps.iter().any(|s| !s.trim().is_empty()) {
            errors.push(ValidationError::new("steps", "At least one step is required"));
        }

        if self.rating.is_some_and(|r| r > MAX_RATING) {
            errors.push(ValidationError::new(
                "rating",
                format!("Rating must be between 0 and {MAX_RATING}"),
            ));
        }

        errors
    }

    /// Returns true if [`validate`](Self::validate) finds nothing.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

//! Search parameters and the statement they compile to.
//!
//! A search is one filtered, sorted scan of `recipes`:
//!
//! - `query`: case-insensitive substring of title, description, notes or the
//!   serialized ingredients, steps or tags (any field matches)
//! - `ingredients`: every term must appear as the start of an ingredient
//!   `"name"` in the serialized list (all terms match)
//! - `tags`: at least one term must appear as an exact quoted string in the
//!   serialized tag list (any term matches)
//! - `min_rating`: `rating >= n`, applied only for 1..=5
//!
//! Ingredient and tag terms are matched against the stored JSON text rather
//! than parsed values, so the ingredient term `egg` also matches `eggplant`.
//!
//! SQLite's `LIKE` is case-insensitive for ASCII only.

use crate::mapper::encode_json;
use crate::schema::{RECIPES_TABLE, RECIPE_COLUMNS};
use rusqlite::types::Value;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Field a search is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    /// Alphabetical by title (binary collation).
    Title,
    /// Creation time.
    CreatedAt,
    /// Last modification time.
    #[default]
    UpdatedAt,
    /// Star rating; unrated records sort as lowest.
    Rating,
}

impl SortBy {
    /// Column backing this sort key.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Rating => "rating",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl SortOrder {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Error parsing a sort key or direction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseSortError {
    kind: &'static str,
    value: String,
}

impl FromStr for SortBy {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Self::Title),
            "createdAt" | "created_at" | "created" => Ok(Self::CreatedAt),
            "updatedAt" | "updated_at" | "updated" => Ok(Self::UpdatedAt),
            "rating" => Ok(Self::Rating),
            other => Err(ParseSortError {
                kind: "sort field",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for SortOrder {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ParseSortError {
                kind: "sort order",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Title => "title",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
            Self::Rating => "rating",
        })
    }
}

/// Search and filter request. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchParams {
    /// Free-text query.
    pub query: Option<String>,
    /// Tag filter (any).
    pub tags: Vec<String>,
    /// Ingredient-name filter (all).
    pub ingredients: Vec<String>,
    /// Minimum star rating, 1-5.
    pub min_rating: Option<u8>,
    /// Sort key.
    pub sort_by: SortBy,
    /// Sort direction.
    pub sort_order: SortOrder,
}

impl SearchParams {
    /// Matches everything, newest change first.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the free-text query.
    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Adds a tag to the tag filter.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Adds an ingredient name to the ingredient filter.
    #[must_use]
    pub fn ingredient(mut self, name: impl Into<String>) -> Self {
        self.ingredients.push(name.into());
        self
    }

    /// Sets the minimum rating.
    #[must_use]
    pub fn min_rating(mut self, rating: u8) -> Self {
        self.min_rating = Some(rating);
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn sort(mut self, by: SortBy, order: SortOrder) -> Self {
        self.sort_by = by;
        self.sort_order = order;
        self
    }

    /// Compiles the parameters into a statement and its bound values.
    #[must_use]
    pub fn to_query(&self) -> SearchQuery {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            let pattern = contains_pattern(query);
            let fields = ["title", "description", "ingredients", "steps", "notes", "tags"];
            let clause = fields
                .iter()
                .map(|f| format!("{f} LIKE ? ESCAPE '\\'"))
                .collect::<Vec<_>>()
                .join(" OR ");
            conditions.push(format!("({clause})"));
            params.extend(fields.iter().map(|_| Value::Text(pattern.clone())));
        }

        if !self.ingredients.is_empty() {
            let clause = vec!["ingredients LIKE ? ESCAPE '\\'"; self.ingredients.len()].join(" AND ");
            conditions.push(format!("({clause})"));
            params.extend(self.ingredients.iter().map(|name| Value::Text(ingredient_pattern(name))));
        }

        if !self.tags.is_empty() {
            let clause = vec!["tags LIKE ? ESCAPE '\\'"; self.tags.len()].join(" OR ");
            conditions.push(format!("({clause})"));
            params.extend(self.tags.iter().map(|tag| Value::Text(tag_pattern(tag))));
        }

        if let Some(min) = self.min_rating.filter(|r| (1..=5).contains(r)) {
            conditions.push("rating >= ?".to_string());
            params.push(Value::Integer(i64::from(min)));
        }

        let mut sql = format!("SELECT {RECIPE_COLUMNS} FROM {RECIPES_TABLE}");
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(&format!(
            " ORDER BY {} {}, rowid ASC",
            self.sort_by.column(),
            self.sort_order.keyword()
        ));

        SearchQuery { sql, params }
    }
}

/// A compiled search statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// SQL text with positional placeholders.
    pub sql: String,
    /// Values bound to the placeholders, in order.
    pub params: Vec<Value>,
}

/// Escapes `LIKE` metacharacters so `text` matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains_pattern(text: &str) -> String {
    format!("%{}%", escape_like(text))
}

/// JSON text of a string, quotes included, as stored in nested columns.
fn json_string(text: &str) -> String {
    encode_json(text).unwrap_or_else(|_| format!("\"{text}\""))
}

fn ingredient_pattern(name: &str) -> String {
    let quoted = json_string(name);
    let open = quoted.strip_suffix('"').unwrap_or(&quoted);
    contains_pattern(&format!("\"name\":{open}"))
}

fn tag_pattern(tag: &str) -> String {
    contains_pattern(&json_string(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &Value) -> &str {
        match value {
            Value::Text(s) => s,
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn empty_params_select_everything_by_updated_desc() {
        let query = SearchParams::new().to_query();
        assert_eq!(
            query.sql,
            format!("SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY updated_at DESC, rowid ASC")
        );
        assert!(query.params.is_empty());
    }

    #[test]
    fn text_query_binds_every_field() {
        let query = SearchParams::new().query("soup").to_query();
        assert_eq!(query.params.len(), 6);
        assert!(query.sql.contains("title LIKE ? ESCAPE '\\' OR description LIKE ?"));
        assert!(query.params.iter().all(|p| text(p) == "%soup%"));
    }

    #[test]
    fn empty_text_query_is_ignored() {
        let query = SearchParams::new().query("").to_query();
        assert!(!query.sql.contains("WHERE"));
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        let query = SearchParams::new().query("100%_a\\b").to_query();
        assert_eq!(text(&query.params[0]), "%100\\%\\_a\\\\b%");
    }

    #[test]
    fn ingredient_terms_are_anded() {
        let query = SearchParams::new().ingredient("egg").ingredient("milk").to_query();
        assert!(query
            .sql
            .contains("(ingredients LIKE ? ESCAPE '\\' AND ingredients LIKE ? ESCAPE '\\')"));
        assert_eq!(text(&query.params[0]), "%\"name\":\"egg%");
        assert_eq!(text(&query.params[1]), "%\"name\":\"milk%");
    }

    #[test]
    fn tag_terms_are_ored_and_quoted() {
        let query = SearchParams::new().tag("a").tag("b").to_query();
        assert!(query.sql.contains("(tags LIKE ? ESCAPE '\\' OR tags LIKE ? ESCAPE '\\')"));
        assert_eq!(text(&query.params[0]), "%\"a\"%");
        assert_eq!(text(&query.params[1]), "%\"b\"%");
    }

    #[test]
    fn tag_with_quote_uses_json_escaping() {
        let query = SearchParams::new().tag("5\" pan").to_query();
        assert_eq!(text(&query.params[0]), "%\"5\\\\\" pan\"%");
    }

    #[test]
    fn min_rating_only_in_range() {
        let query = SearchParams::new().min_rating(3).to_query();
        assert!(query.sql.contains("rating >= ?"));
        assert_eq!(query.params, vec![Value::Integer(3)]);

        for ignored in [0, 6] {
            let query = SearchParams::new().min_rating(ignored).to_query();
            assert!(!query.sql.contains("rating >="));
        }
    }

    #[test]
    fn filters_combine_with_and() {
        let query = SearchParams::new()
            .query("x")
            .tag("t")
            .min_rating(2)
            .sort(SortBy::Title, SortOrder::Asc)
            .to_query();
        assert_eq!(query.sql.matches(") AND (").count(), 1);
        assert!(query.sql.contains(" AND rating >= ?"));
        assert!(query.sql.ends_with("ORDER BY title ASC, rowid ASC"));
        assert_eq!(query.params.len(), 8);
    }

    #[test]
    fn parses_sort_keys() {
        assert_eq!("createdAt".parse::<SortBy>().unwrap(), SortBy::CreatedAt);
        assert_eq!("updated_at".parse::<SortBy>().unwrap(), SortBy::UpdatedAt);
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert!("price".parse::<SortBy>().is_err());
        assert_eq!(SortBy::Rating.to_string(), "rating");
    }

    #[test]
    fn deserializes_request_object() {
        let params: SearchParams = serde_json::from_str(
            r#"{"query":"pie","tags":["dessert"],"minRating":4,"sortBy":"title","sortOrder":"asc"}"#,
        )
        .unwrap();
        assert_eq!(params.query.as_deref(), Some("pie"));
        assert_eq!(params.tags, vec!["dessert"]);
        assert_eq!(params.min_rating, Some(4));
        assert_eq!(params.sort_by, SortBy::Title);
        assert_eq!(params.sort_order, SortOrder::Asc);
    }

    fn like(conn: &rusqlite::Connection, text: &str, pattern: &str) -> bool {
        conn.query_row("SELECT ?1 LIKE ?2 ESCAPE '\\'", [text, pattern], |r| r.get(0))
            .unwrap()
    }

    proptest::proptest! {
        #[test]
        fn escaped_pattern_matches_literally(text in "[a-z%_\\\\]{1,12}") {
            let conn = rusqlite::Connection::open_in_memory().unwrap();
            let pattern = contains_pattern(&text);
            let wrapped = format!("<{text}>");
            proptest::prop_assert!(like(&conn, &wrapped, &pattern));

            // Wildcards in the term must not stand for other characters.
            if text.contains(['%', '_']) {
                let literal = text.replace(['%', '_'], "x");
                proptest::prop_assert!(!like(&conn, &literal, &pattern));
            }
        }
    }
}

//! # Recipebox Core
//!
//! Local persistence and query layer for a personal recipe collection.
//!
//! Recipes live in an embedded SQLite database held in memory. After every
//! mutation the whole database image is written to a
//! [`BlockStore`](recipebox_storage::BlockStore), so the store always holds
//! the latest committed state and nothing else.
//!
//! This crate provides:
//! - [`Engine`]: startup, schema migration, corruption recovery, snapshots
//! - [`RecipeRow`]: the mapping between stored rows and [`Recipe`] values
//! - [`Repository`]: CRUD, search and tag/ingredient listings
//! - [`BackupManager`]: binary image and JSON export/import
//!
//! ## Example
//!
//! ```rust
//! use recipebox_core::{Config, Engine, Ingredient, RecipeDraft, Repository, SearchParams};
//! use std::sync::Arc;
//!
//! let engine = Arc::new(Engine::open_in_memory(Config::default()).unwrap());
//! let repo = Repository::new(engine);
//!
//! let soup = repo
//!     .create(
//!         RecipeDraft::new("Tomato soup")
//!             .ingredient(Ingredient::named("Tomato"))
//!             .step("Simmer")
//!             .tag("dinner"),
//!     )
//!     .unwrap();
//!
//! let found = repo.search(&SearchParams::new().tag("dinner")).unwrap();
//! assert_eq!(found, vec![soup]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backup;
mod config;
mod engine;
mod error;
mod id;
mod interchange;
mod mapper;
pub mod migration;
mod repository;
pub mod schema;
mod search;
mod types;
mod validation;

pub use backup::{BackupManager, ImageInfo};
pub use config::{Config, DEFAULT_IMAGE_KEY, DEFAULT_STORE_NAME, SAMPLE_RECIPES};
pub use engine::Engine;
pub use error::{CoreError, CoreResult};
pub use id::RecipeId;
pub use interchange::{
    ExportDocument, ExportRecord, ImportMode, ImportReport, ParseImportModeError, EXPORT_VERSION,
};
pub use mapper::{encode_json, RecipeRow};
pub use migration::MigrationReport;
pub use repository::Repository;
pub use search::{ParseSortError, SearchParams, SearchQuery, SortBy, SortOrder};
pub use types::{now_timestamp, Ingredient, Recipe, RecipeDraft, RecipePatch, DEFAULT_SERVINGS};
pub use validation::{
    ValidationError, MAX_DESCRIPTION_CHARS, MAX_PHOTOS, MAX_RATING, MAX_TITLE_CHARS,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

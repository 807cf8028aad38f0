//! Engine configuration.

/// Name of the block store used when none is configured.
pub const DEFAULT_STORE_NAME: &str = "recipe-app-db";

/// Key under which the engine image is persisted.
pub const DEFAULT_IMAGE_KEY: &str = "data";

/// Sample recipes bundled with the crate, in interchange format.
pub const SAMPLE_RECIPES: &str = include_str!("../data/sample-recipes.json");

/// Configuration for opening an engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the block store holding the snapshot.
    pub store_name: String,

    /// Key of the snapshot within the block store.
    pub image_key: String,

    /// Interchange document imported once when a brand-new store is created.
    pub seed: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_name: DEFAULT_STORE_NAME.to_string(),
            image_key: DEFAULT_IMAGE_KEY.to_string(),
            seed: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the block store name.
    #[must_use]
    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = name.into();
        self
    }

    /// Sets the snapshot key.
    #[must_use]
    pub fn image_key(mut self, key: impl Into<String>) -> Self {
        self.image_key = key.into();
        self
    }

    /// Sets the first-run seed document.
    #[must_use]
    pub fn seed(mut self, document: Option<String>) -> Self {
        self.seed = document;
        self
    }

    /// Seeds a brand-new store with the bundled sample recipes.
    #[must_use]
    pub fn with_sample_recipes(self) -> Self {
        self.seed(Some(SAMPLE_RECIPES.to_string()))
    }
}

//! CLI command implementations.

pub mod backup;
pub mod interchange;
pub mod recipes;
pub mod reset;
pub mod vocabulary;

use clap::ValueEnum;
use recipebox_core::{Config, Engine, RecipeId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Result type shared by the commands.
pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Failures detected by the CLI itself, before reaching the store.
#[derive(Debug, Error)]
pub enum CliError {
    /// The command needs `--path`.
    #[error("store path required for {0} (use --path <dir>)")]
    MissingPath(&'static str),

    /// No recipe has the given id.
    #[error("no recipe with id {0}")]
    NotFound(RecipeId),

    /// A recipe form failed validation.
    #[error("recipe form is invalid:\n{0}")]
    InvalidForm(String),

    /// The user did not confirm a destructive command.
    #[error("refusing to {0} without --yes")]
    NotConfirmed(&'static str),
}

/// Output format for commands that print data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Where the store lives and how to create it.
#[derive(Debug, Clone)]
pub struct StoreArgs {
    /// Root directory given with `--path`.
    pub path: Option<PathBuf>,
    /// Seed a brand-new store with the sample recipes.
    pub samples: bool,
}

impl StoreArgs {
    /// Engine configuration for these arguments.
    pub fn config(&self) -> Config {
        if self.samples {
            Config::new().with_sample_recipes()
        } else {
            Config::new()
        }
    }

    /// Opens the store and starts the engine.
    pub fn open(&self, command: &'static str) -> CommandResult<Arc<Engine>> {
        let root = self.root(command)?;
        Ok(Arc::new(Engine::open(root, self.config())?))
    }

    fn root(&self, command: &'static str) -> Result<&Path, CliError> {
        self.path.as_deref().ok_or(CliError::MissingPath(command))
    }
}

/// Prints `value` as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! Recipebox CLI
//!
//! Command-line front end for a recipebox store.
//!
//! # Commands
//!
//! - `list`, `show`, `add`, `update`, `delete` - Work with recipes
//! - `tags`, `ingredients` - List the vocabularies in use
//! - `export`, `import` - Structured JSON interchange
//! - `backup`, `restore`, `verify` - Binary database images
//! - `reset` - Destroy the store and start over

mod commands;

use clap::{Parser, Subcommand};
use commands::Format;
use recipebox_core::{ImportMode, SortBy, SortOrder};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Recipebox command-line tools.
#[derive(Parser)]
#[command(name = "recipebox")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the recipe store
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Do not add the sample recipes when a new store is created
    #[arg(global = true, long)]
    no_samples: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List recipes, optionally filtered and sorted
    List {
        /// Text to look for in any field
        #[arg(short, long)]
        query: Option<String>,

        /// Keep recipes carrying any of these tags
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Keep recipes containing all of these ingredients
        #[arg(short, long = "ingredient")]
        ingredients: Vec<String>,

        /// Minimum star rating (1-5)
        #[arg(short = 'r', long)]
        min_rating: Option<u8>,

        /// Sort field (title, createdAt, updatedAt, rating)
        #[arg(short, long, default_value = "updatedAt")]
        sort_by: SortBy,

        /// Sort order (asc, desc)
        #[arg(short, long, default_value = "desc")]
        order: SortOrder,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show one recipe
    Show {
        /// Recipe id
        id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Create a recipe from a JSON form file
    Add {
        /// File holding the recipe form (camelCase fields)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Change fields of a recipe from a JSON file
    Update {
        /// Recipe id
        id: String,

        /// File holding the fields to change
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Delete a recipe
    Delete {
        /// Recipe id
        id: String,
    },

    /// List every tag in use
    Tags,

    /// List every ingredient name in use
    Ingredients,

    /// Export all recipes as JSON
    Export {
        /// Output file
        output: PathBuf,
    },

    /// Import recipes from a JSON export
    Import {
        /// Input file
        input: PathBuf,

        /// What to do with recipes whose id already exists (skip, overwrite)
        #[arg(short, long, default_value = "skip")]
        mode: ImportMode,
    },

    /// Write the binary database image to a file
    Backup {
        /// Output file
        output: PathBuf,
    },

    /// Replace the database with a binary image
    Restore {
        /// Input file
        input: PathBuf,
    },

    /// Check a binary image without restoring it
    Verify {
        /// Input file
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Delete every recipe and start from a new store
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store = commands::StoreArgs {
        path: cli.path,
        samples: !cli.no_samples,
    };

    match cli.command {
        Commands::List {
            query,
            tags,
            ingredients,
            min_rating,
            sort_by,
            order,
            format,
        } => {
            let params = commands::recipes::search_params(
                query,
                tags,
                ingredients,
                min_rating,
                sort_by,
                order,
            );
            commands::recipes::list(&store, &params, format)?;
        }
        Commands::Show { id, format } => commands::recipes::show(&store, &id, format)?,
        Commands::Add { file } => commands::recipes::add(&store, &file)?,
        Commands::Update { id, file } => commands::recipes::update(&store, &id, &file)?,
        Commands::Delete { id } => commands::recipes::delete(&store, &id)?,
        Commands::Tags => commands::vocabulary::tags(&store)?,
        Commands::Ingredients => commands::vocabulary::ingredients(&store)?,
        Commands::Export { output } => commands::interchange::export(&store, &output)?,
        Commands::Import { input, mode } => commands::interchange::import(&store, &input, mode)?,
        Commands::Backup { output } => commands::backup::create(&store, &output)?,
        Commands::Restore { input } => commands::backup::restore(&store, &input)?,
        Commands::Verify { input, format } => commands::backup::verify(&input, format)?,
        Commands::Reset { yes } => commands::reset::run(&store, yes)?,
        Commands::Version => {
            println!("Recipebox CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Recipebox Core v{}", recipebox_core::VERSION);
        }
    }

    Ok(())
}

//! Reset command.

use super::{CliError, CommandResult, StoreArgs};
use recipebox_core::Repository;

/// Destroys the store and reinitializes it.
///
/// Requires `--yes`; with samples enabled the new store is seeded again.
pub fn run(store: &StoreArgs, confirmed: bool) -> CommandResult {
    if !confirmed {
        return Err(CliError::NotConfirmed("reset the store").into());
    }
    let engine = store.open("reset")?;
    engine.reset()?;

    let remaining = Repository::new(engine).count()?;
    println!("✓ Store reset");
    println!("  Recipes: {remaining}");
    Ok(())
}

//! Tag and ingredient listings.

use super::{CommandResult, StoreArgs};
use recipebox_core::Repository;

/// Prints every tag in use, one per line.
pub fn tags(store: &StoreArgs) -> CommandResult {
    let repo = Repository::new(store.open("tags")?);
    for tag in repo.list_tags()? {
        println!("{tag}");
    }
    Ok(())
}

/// Prints every ingredient name in use, one per line.
pub fn ingredients(store: &StoreArgs) -> CommandResult {
    let repo = Repository::new(store.open("ingredients")?);
    for name in repo.list_ingredient_names()? {
        println!("{name}");
    }
    Ok(())
}

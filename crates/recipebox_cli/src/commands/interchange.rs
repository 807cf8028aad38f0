//! Structured JSON export and import commands.

use super::{CommandResult, StoreArgs};
use recipebox_core::{BackupManager, ImportMode};
use std::fs;
use std::path::Path;
use tracing::info;

/// Writes every recipe to `output` as an interchange document.
pub fn export(store: &StoreArgs, output: &Path) -> CommandResult {
    let backup = BackupManager::new(store.open("export")?);
    let document = backup.export_records()?;
    fs::write(output, document.to_json_pretty()?)?;

    println!("✓ Exported {} recipe(s)", document.recipes.len());
    println!("  Path: {:?}", output);
    Ok(())
}

/// Merges the recipes in `input` into the store.
pub fn import(store: &StoreArgs, input: &Path, mode: ImportMode) -> CommandResult {
    info!("Importing recipes from {:?} ({mode})", input);
    let text = fs::read_to_string(input)?;
    let backup = BackupManager::new(store.open("import")?);
    let report = backup.import_records_json(&text, mode)?;

    println!("✓ Import finished");
    println!("  Imported: {}", report.imported);
    println!("  Skipped: {}", report.skipped);
    if !report.errors.is_empty() {
        println!("  Errors: {}", report.errors.len());
        for error in &report.errors {
            println!("    - {error}");
        }
    }
    Ok(())
}

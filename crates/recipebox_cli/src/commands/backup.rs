//! Binary backup, restore and verify commands.
//!
//! A backup file is the complete database image, byte for byte. Restoring
//! replaces every recipe in the store; use `import` to merge instead.

use super::{print_json, CommandResult, Format, StoreArgs};
use recipebox_core::{BackupManager, ImageInfo};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Writes the database image to `output_path`.
pub fn create(store: &StoreArgs, output_path: &Path) -> CommandResult {
    let backup = BackupManager::new(store.open("backup")?);
    let image = backup.export_image()?;

    let mut file = fs::File::create(output_path)?;
    file.write_all(&image)?;
    file.sync_all()?;

    println!("✓ Backup created successfully");
    println!("  Path: {:?}", output_path);
    println!("  Size: {} bytes", image.len());
    Ok(())
}

/// Replaces the database with the image in `input_path`.
///
/// The image is checked first; an incompatible file leaves the store as it was.
pub fn restore(store: &StoreArgs, input_path: &Path) -> CommandResult {
    info!("Restoring database from {:?}", input_path);
    let image = fs::read(input_path)?;

    let backup = BackupManager::new(store.open("restore")?);
    let report = backup.import_image(&image)?;

    println!("✓ Database restored successfully");
    println!("  From: {:?}", input_path);
    if !report.is_noop() {
        let columns: Vec<_> = report.applied.iter().map(|m| m.column).collect();
        println!("  Migrated: added {}", columns.join(", "));
    }
    Ok(())
}

/// Checks a backup file without touching any store.
pub fn verify(input_path: &Path, format: Format) -> CommandResult {
    info!("Verifying backup {:?}", input_path);
    let image = fs::read(input_path)?;
    let info = BackupManager::inspect_image(&image)?;

    match format {
        Format::Json => print_json(&info)?,
        Format::Text => print_info(&info),
    }

    if info.integrity_ok {
        Ok(())
    } else {
        Err("Backup failed the integrity check".into())
    }
}

fn print_info(info: &ImageInfo) {
    if info.integrity_ok {
        println!("✓ Backup is valid");
    } else {
        println!("✗ Backup is damaged");
    }
    println!("  Size: {} bytes", info.size);
    println!("  Schema version: {}", info.schema_version);
    println!("  Recipes: {}", info.recipe_count);
    if !info.pending_columns.is_empty() {
        println!(
            "  Needs migration: {} (applied on restore)",
            info.pending_columns.join(", ")
        );
    }
}

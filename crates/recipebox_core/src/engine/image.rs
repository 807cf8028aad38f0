//! Conversion between a live connection and its serialized image.
//!
//! An image is a complete SQLite database file. Exporting serializes the
//! in-memory database without touching the filesystem. Opening restores the
//! bytes from a temporary file; it only runs at startup and on image import.

use crate::error::CoreResult;
use rusqlite::{Connection, DatabaseName};
use std::fs;
use tempfile::NamedTempFile;

/// Serializes the whole database behind `conn`.
pub fn export(conn: &Connection) -> CoreResult<Vec<u8>> {
    let image = conn.serialize(DatabaseName::Main)?;
    Ok(image.to_vec())
}

/// Opens an in-memory connection holding a copy of `bytes`.
///
/// Only fails if SQLite rejects the bytes outright; whether the contents are
/// a recipe database is checked separately by [`crate::schema::probe`].
pub fn open(bytes: &[u8]) -> CoreResult<Connection> {
    let source = NamedTempFile::new()?;
    fs::write(source.path(), bytes)?;

    let mut conn = Connection::open_in_memory()?;
    conn.restore(
        DatabaseName::Main,
        source.path(),
        None::<fn(rusqlite::backup::Progress)>,
    )?;
    Ok(conn)
}

/// Creates an empty in-memory connection with the current schema applied.
pub fn fresh() -> CoreResult<Connection> {
    let conn = Connection::open_in_memory()?;
    crate::schema::apply(&conn)?;
    Ok(conn)
}

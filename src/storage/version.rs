//! Schema generation detection
//!
//! Decides what kind of file sits at the store path before the long-lived
//! connection is opened:
//! - `Absent`: no exercises table (or no file at all), build a fresh schema
//! - `Legacy`: exercises table without the `metameg` table, reported as `0.1`
//! - `Version(v)`: the version recorded in the metadata row

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension};

use super::schema::{CURRENT_VERSION, EXERCISES_TABLE, LEGACY_VERSION, METADATA_TABLE};
use crate::Result;

/// Schema generation found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Absent,
    Legacy,
    Version(String),
}

impl Generation {
    /// The version tag, if any schema exists
    pub fn version(&self) -> Option<&str> {
        match self {
            Generation::Absent => None,
            Generation::Legacy => Some(LEGACY_VERSION),
            Generation::Version(v) => Some(v.as_str()),
        }
    }

    /// What startup should do with a file of this generation
    pub fn transition(&self, current: &str) -> Transition {
        match self.version() {
            None => Transition::Create,
            Some(v) if v == current => Transition::Proceed,
            Some(v) => Transition::Quarantine { from: v.to_string() },
        }
    }
}

/// Startup action chosen from the detected generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Build the schema at the current version
    Create,
    /// Open as-is
    Proceed,
    /// Move the file aside, build a fresh schema, then fail
    Quarantine { from: String },
}

/// Inspect `path` on a transient read-only connection.
///
/// A missing file is reported as `Absent` and is not created.
pub fn detect_version(path: &Path) -> Result<Generation> {
    if !path.exists() {
        return Ok(Generation::Absent);
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let generation = detect_on(&conn)?;
    conn.close().map_err(|(_, e)| e)?;

    tracing::debug!(
        "Version in {}: {:?} (current {})",
        path.display(),
        generation,
        CURRENT_VERSION
    );
    Ok(generation)
}

/// Detect the generation of an already-open database
pub fn detect_on(conn: &Connection) -> Result<Generation> {
    if !table_exists(conn, EXERCISES_TABLE)? {
        return Ok(Generation::Absent);
    }
    if !table_exists(conn, METADATA_TABLE)? {
        return Ok(Generation::Legacy);
    }

    // Any stored type is accepted so an odd file still reaches quarantine
    let version: Option<Option<String>> = conn
        .query_row("SELECT version FROM metameg LIMIT 1", [], |row| {
            Ok(match row.get_ref(0)? {
                ValueRef::Null => None,
                ValueRef::Integer(i) => Some(i.to_string()),
                ValueRef::Real(f) => Some(f.to_string()),
                ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                    Some(String::from_utf8_lossy(bytes).into_owned())
                }
            })
        })
        .optional()?;

    Ok(match version.flatten() {
        Some(v) => Generation::Version(v),
        None => Generation::Legacy,
    })
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Path an incompatible file is moved to: `<path>.<version>`
pub fn quarantine_path(path: &Path, version: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(version);
    PathBuf::from(name)
}

/// Move an incompatible file aside. An earlier quarantine is never overwritten.
pub fn quarantine(path: &Path, version: &str) -> Result<PathBuf> {
    let target = quarantine_path(path, version);
    if target.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("quarantine target {} already exists", target.display()),
        )
        .into());
    }
    std::fs::rename(path, &target)?;
    tracing::warn!(
        "Moved database with schema version {} from {} to {}",
        version,
        path.display(),
        target.display()
    );
    Ok(target)
}

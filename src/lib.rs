//! # localstore - exercise record store
//!
//! Single-file, single-table persistence for exercise records backed by SQLite.
//!
//! localstore provides:
//! - A fixed-shape `Exercise` record keyed by `unique_name`
//! - Upsert-by-key writes, each committed as its own transaction
//! - Case-insensitive, multiline, Unicode-aware regex search across all text columns
//! - A schema version gate that quarantines incompatible files instead of losing data
//! - A lazy iterator for bulk traversal
//!
//! ## Threading
//!
//! [`ExerciseStore`] owns one SQLite connection. It can be moved to another
//! thread but is not `Sync`: use one store per thread, or guard a shared
//! store with a mutex around every call.

pub mod config;
pub mod exercise;
pub mod regexp;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use config::{resolve_db_path, resolve_db_path_in, DEFAULT_DB_FILENAME};
pub use exercise::{Exercise, StoredExercise};
pub use storage::{
    ExerciseIter, ExerciseStore, Generation, StoreMetadata, StoreOptions, UpsertOutcome,
};

/// Result type alias for localstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for localstore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file on disk has a schema generation this build cannot read.
    /// The old file has already been moved to `quarantined`.
    #[error(
        "no migration path available from version {from} to {to}; previous database kept at {}",
        .quarantined.display()
    )]
    SchemaMigrationUnsupported {
        from: String,
        to: String,
        quarantined: std::path::PathBuf,
    },

    #[error("Exercise name already exists in database: {0}")]
    DuplicateKey(String),

    #[error("Invalid search pattern: {0}")]
    SearchPattern(#[from] regex::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No database path given and no home directory could be resolved")]
    HomeNotFound,

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// True for failures of the underlying file or connection, which a
    /// caller may choose to retry.
    pub fn is_storage_io(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Io(_))
    }
}

//! SQLite storage implementation

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::Serialize;

use super::iter::ExerciseIter;
use super::schema::{self, CURRENT_VERSION, EXERCISE_COLUMNS};
use super::version::{self, Transition};
use crate::exercise::{Exercise, StoredExercise};
use crate::{config, regexp, Error, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Construction-time settings for an [`ExerciseStore`]
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Written to the metadata row of a new file
    pub natural_language: String,
    /// Written to the metadata row of a new file
    pub markup_language: String,
    /// Log write notices at `info` instead of `debug`
    pub verbose: bool,
    /// Rows fetched per statement by [`ExerciseIter`]
    pub page_size: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            natural_language: "pt_pt".to_string(),
            markup_language: "latex".to_string(),
            verbose: false,
            page_size: 64,
        }
    }
}

/// Contents of the metadata row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreMetadata {
    pub natural_language: String,
    pub markup_language: String,
    pub version: String,
}

/// Which write an upsert performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// SQLite-backed store for exercise records.
///
/// Owns a single connection for its lifetime. Every write commits before
/// returning.
pub struct ExerciseStore {
    conn: Connection,
    path: Option<PathBuf>,
    options: StoreOptions,
}

impl ExerciseStore {
    /// Open the store at `path`, or at `$HOME/meguadb.sqlite` when `None`.
    ///
    /// A file with an older or unknown schema generation is renamed to
    /// `<path>.<version>`, a fresh store is created in its place, and
    /// `Error::SchemaMigrationUnsupported` is returned.
    pub fn open(path: Option<&Path>, options: StoreOptions) -> Result<Self> {
        let path = config::resolve_db_path(path)?;
        Self::open_at(&path, options)
    }

    /// Open the store at an already-resolved path
    pub fn open_at(path: &Path, options: StoreOptions) -> Result<Self> {
        let generation = version::detect_version(path)?;

        match generation.transition(CURRENT_VERSION) {
            Transition::Proceed => Self::connect(path, options),
            Transition::Create => {
                let store = Self::connect(path, options)?;
                store.initialize_schema()?;
                Ok(store)
            }
            Transition::Quarantine { from } => {
                let quarantined = version::quarantine(path, &from)?;
                let store = Self::connect(path, options)?;
                store.initialize_schema()?;
                drop(store);
                tracing::error!(
                    "No migration path from schema version {} to {}",
                    from,
                    CURRENT_VERSION
                );
                Err(Error::SchemaMigrationUnsupported {
                    from,
                    to: CURRENT_VERSION.to_string(),
                    quarantined,
                })
            }
        }
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with(StoreOptions::default())
    }

    pub fn open_in_memory_with(options: StoreOptions) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        regexp::register(&conn)?;
        let store = Self { conn, path: None, options };
        store.initialize_schema()?;
        Ok(store)
    }

    fn connect(path: &Path, options: StoreOptions) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        regexp::register(&conn)?;
        tracing::debug!("Database opened in: {}", path.display());
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
            options,
        })
    }

    /// Create both tables and the metadata row in one transaction
    fn initialize_schema(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for stmt in schema::all_schema_statements() {
            tx.execute(stmt, [])?;
        }
        tx.execute(
            schema::INSERT_METADATA,
            params![
                self.options.natural_language,
                self.options.markup_language,
                CURRENT_VERSION,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// File backing this store; `None` in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    // ========== Write Operations ==========

    /// Insert a new exercise and return its assigned `problem_id`.
    ///
    /// Fails with `Error::DuplicateKey` if `unique_name` is already stored.
    pub fn create(&self, exercise: &Exercise) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO exercises (unique_name, sections_text, suggestive_name,
                    summary_text, problem_text, answer_text, class_text)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    exercise.unique_name,
                    exercise.sections_text,
                    exercise.suggestive_name,
                    exercise.summary_text,
                    exercise.problem_text,
                    exercise.answer_text,
                    exercise.class_text,
                ],
            )
            .map_err(|e| duplicate_or(e, &exercise.unique_name))?;

        let id = self.conn.last_insert_rowid();
        self.log_write(&exercise.unique_name, "inserted in");
        Ok(id)
    }

    /// Replace every field except the key and id. Returns `false` when no
    /// exercise has this `unique_name`.
    pub fn update(&self, exercise: &Exercise) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            UPDATE exercises
            SET sections_text = ?1, suggestive_name = ?2, summary_text = ?3,
                problem_text = ?4, answer_text = ?5, class_text = ?6
            WHERE unique_name = ?7
            "#,
            params![
                exercise.sections_text,
                exercise.suggestive_name,
                exercise.summary_text,
                exercise.problem_text,
                exercise.answer_text,
                exercise.class_text,
                exercise.unique_name,
            ],
        )?;

        if changed > 0 {
            self.log_write(&exercise.unique_name, "changed in");
        }
        Ok(changed > 0)
    }

    /// Insert or update by `unique_name`, then return the row as stored
    pub fn upsert(&self, exercise: &Exercise) -> Result<StoredExercise> {
        self.upsert_with_status(exercise).map(|(stored, _)| stored)
    }

    /// Like [`upsert`](Self::upsert), also reporting which write happened
    pub fn upsert_with_status(
        &self,
        exercise: &Exercise,
    ) -> Result<(StoredExercise, UpsertOutcome)> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let outcome = if self.update(exercise)? {
            UpsertOutcome::Updated
        } else {
            self.create(exercise)?;
            UpsertOutcome::Inserted
        };
        let stored = self
            .lookup(&exercise.unique_name)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;

        tx.commit()?;
        Ok((stored, outcome))
    }

    /// Remove an exercise. Returns `false` if it was not stored.
    pub fn delete(&self, unique_name: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM exercises WHERE unique_name = ?1", [unique_name])?;
        if changed > 0 {
            self.log_write(unique_name, "removed from");
        }
        Ok(changed > 0)
    }

    /// Change the key of an exercise.
    ///
    /// Fails with `Error::DuplicateKey` if `new_name` is already taken, in
    /// which case nothing is modified. Returns `false` if `old_name` is not
    /// stored.
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<bool> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        if self.exists(new_name)? {
            return Err(Error::DuplicateKey(new_name.to_string()));
        }
        let changed = tx
            .execute(
                "UPDATE exercises SET unique_name = ?1 WHERE unique_name = ?2",
                params![new_name, old_name],
            )
            .map_err(|e| duplicate_or(e, new_name))?;

        tx.commit()?;
        if changed > 0 {
            self.log_write(&format!("{} -> {}", old_name, new_name), "renamed in");
        }
        Ok(changed > 0)
    }

    // ========== Read Operations ==========

    /// Get an exercise by key
    pub fn lookup(&self, unique_name: &str) -> Result<Option<StoredExercise>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM exercises WHERE unique_name = ?1", EXERCISE_COLUMNS),
                [unique_name],
                row_to_exercise,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn exists(&self, unique_name: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT problem_id FROM exercises WHERE unique_name = ?1",
                [unique_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// All exercises where any text column matches `pattern`, ordered by
    /// `unique_name`
    pub fn search(&self, pattern: &str) -> Result<Vec<StoredExercise>> {
        regexp::build_pattern(pattern)?;

        let sql = format!(
            "SELECT {} FROM exercises WHERE {} ORDER BY unique_name",
            EXERCISE_COLUMNS,
            schema::match_any_text("?1")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let exercises = stmt
            .query_map([pattern], row_to_exercise)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| regexp::classify_query_error(pattern, e))?;

        tracing::debug!("Search {:?} matched {} exercises", pattern, exercises.len());
        Ok(exercises)
    }

    /// Lazily iterate over every exercise in `unique_name` order
    pub fn iter(&self) -> Result<ExerciseIter<'_>> {
        ExerciseIter::new(self, None)
    }

    /// Lazily iterate over the exercises [`search`](Self::search) would return
    pub fn iter_matching(&self, pattern: &str) -> Result<ExerciseIter<'_>> {
        ExerciseIter::new(self, Some(pattern.to_string()))
    }

    /// Count all exercises
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM exercises", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn metadata(&self) -> Result<StoreMetadata> {
        self.conn
            .query_row(
                "SELECT natural_language, markup_language, version FROM metameg LIMIT 1",
                [],
                |row| {
                    Ok(StoreMetadata {
                        natural_language: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                        markup_language: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        version: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    })
                },
            )
            .map_err(Into::into)
    }

    fn log_write(&self, unique_name: &str, action: &str) {
        if self.options.verbose {
            tracing::info!("Exercise '{}' {} database.", unique_name, action);
        } else {
            tracing::debug!("Exercise '{}' {} database.", unique_name, action);
        }
    }
}

/// Helper to convert a row selected with `EXERCISE_COLUMNS` to a StoredExercise.
/// NULL text (legacy files) reads as empty.
pub(crate) fn row_to_exercise(row: &rusqlite::Row) -> rusqlite::Result<StoredExercise> {
    let text = |idx: usize| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
    };

    Ok(StoredExercise {
        problem_id: row.get(0)?,
        exercise: Exercise {
            unique_name: text(1)?,
            sections_text: text(2)?,
            suggestive_name: text(3)?,
            summary_text: text(4)?,
            problem_text: text(5)?,
            answer_text: text(6)?,
            class_text: text(7)?,
        },
    })
}

fn duplicate_or(err: rusqlite::Error, unique_name: &str) -> Error {
    let unique_violation = matches!(
        &err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    );
    if unique_violation {
        Error::DuplicateKey(unique_name.to_string())
    } else {
        Error::Storage(err)
    }
}

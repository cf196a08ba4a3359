//! Storage Layer - SQLite-backed persistence
//!
//! One database file with two tables:
//! - exercises(problem_id, unique_name, sections_text, suggestive_name,
//!   summary_text, problem_text, answer_text, class_text)
//! - metameg(natural_language, markup_language, version)

pub mod iter;
pub mod schema;
pub mod sqlite;
pub mod version;

pub use iter::ExerciseIter;
pub use sqlite::{ExerciseStore, StoreMetadata, StoreOptions, UpsertOutcome};
pub use version::{detect_version, Generation, Transition};

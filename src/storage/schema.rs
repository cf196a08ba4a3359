//! Database schema definitions

use crate::exercise::TEXT_COLUMNS;

/// Schema generation written by this build
pub const CURRENT_VERSION: &str = "0.2.1";

/// Generation reported for files that predate the metadata table
pub const LEGACY_VERSION: &str = "0.1";

pub const EXERCISES_TABLE: &str = "exercises";
pub const METADATA_TABLE: &str = "metameg";

/// SQL to create the exercises table
pub const CREATE_EXERCISES_TABLE: &str = r#"
CREATE TABLE exercises (
    problem_id INTEGER PRIMARY KEY ASC AUTOINCREMENT,
    unique_name TEXT NOT NULL UNIQUE,
    sections_text TEXT NOT NULL DEFAULT '',
    suggestive_name TEXT NOT NULL DEFAULT '',
    summary_text TEXT NOT NULL DEFAULT '',
    problem_text TEXT NOT NULL DEFAULT '',
    answer_text TEXT NOT NULL DEFAULT '',
    class_text TEXT NOT NULL DEFAULT ''
)
"#;

/// SQL to create the single-row metadata table
pub const CREATE_METADATA_TABLE: &str = r#"
CREATE TABLE metameg (
    natural_language TEXT,
    markup_language TEXT,
    version TEXT
)
"#;

pub const INSERT_METADATA: &str =
    "INSERT INTO metameg (natural_language, markup_language, version) VALUES (?1, ?2, ?3)";

/// Column list shared by every SELECT that builds a `StoredExercise`
pub const EXERCISE_COLUMNS: &str = "problem_id, unique_name, sections_text, suggestive_name, \
     summary_text, problem_text, answer_text, class_text";

/// WHERE clause testing `param` against every text column, OR-ed together
pub fn match_any_text(param: &str) -> String {
    let terms: Vec<String> = TEXT_COLUMNS
        .iter()
        .map(|column| format!("{} REGEXP {}", column, param))
        .collect();
    format!("({})", terms.join(" OR "))
}

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![CREATE_EXERCISES_TABLE, CREATE_METADATA_TABLE]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_any_text_covers_all_columns() {
        let clause = match_any_text("?1");
        for column in TEXT_COLUMNS {
            assert!(clause.contains(&format!("{} REGEXP ?1", column)));
        }
        assert_eq!(clause.matches(" OR ").count(), TEXT_COLUMNS.len() - 1);
    }
}

//! Exercise records
//!
//! An exercise is identified externally by `unique_name`. The engine also
//! assigns a surrogate `problem_id` on first insert; callers never supply it,
//! so writes take an [`Exercise`] and reads return a [`StoredExercise`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Column names of the text fields searched by the regex predicate.
pub const TEXT_COLUMNS: [&str; 6] = [
    "sections_text",
    "suggestive_name",
    "summary_text",
    "problem_text",
    "answer_text",
    "class_text",
];

/// One exercise entry as supplied by the caller.
///
/// Text is stored verbatim. Missing text fields deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Exercise {
    /// Stable external key, unique across the store
    pub unique_name: String,
    /// `Section; Subsection; ...` or empty
    #[serde(default)]
    pub sections_text: String,
    /// Human-friendly title for the problem
    #[serde(default)]
    pub suggestive_name: String,
    #[serde(default)]
    pub summary_text: String,
    #[serde(default)]
    pub problem_text: String,
    #[serde(default)]
    pub answer_text: String,
    /// Generated source code, interpreted by the caller
    #[serde(default)]
    pub class_text: String,
}

impl Exercise {
    /// Create an exercise with the given key and empty text fields
    pub fn new(unique_name: impl Into<String>) -> Self {
        Self {
            unique_name: unique_name.into(),
            ..Self::default()
        }
    }

    pub fn with_sections(mut self, text: impl Into<String>) -> Self {
        self.sections_text = text.into();
        self
    }

    pub fn with_suggestive_name(mut self, text: impl Into<String>) -> Self {
        self.suggestive_name = text.into();
        self
    }

    pub fn with_summary(mut self, text: impl Into<String>) -> Self {
        self.summary_text = text.into();
        self
    }

    pub fn with_problem(mut self, text: impl Into<String>) -> Self {
        self.problem_text = text.into();
        self
    }

    pub fn with_answer(mut self, text: impl Into<String>) -> Self {
        self.answer_text = text.into();
        self
    }

    pub fn with_class(mut self, text: impl Into<String>) -> Self {
        self.class_text = text.into();
        self
    }
}

/// An exercise as persisted, including its engine-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredExercise {
    pub problem_id: i64,
    #[serde(flatten)]
    pub exercise: Exercise,
}

impl StoredExercise {
    pub fn unique_name(&self) -> &str {
        &self.exercise.unique_name
    }
}

impl fmt::Display for StoredExercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Record {:03}: {}", self.problem_id, self.exercise.unique_name)?;
        writeln!(f)?;
        writeln!(f, "{}", self.exercise.problem_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_text_fields_default_to_empty() {
        let ex: Exercise = serde_json::from_str(r#"{"unique_name": "ex1", "answer_text": "42"}"#).unwrap();
        assert_eq!(ex.unique_name, "ex1");
        assert_eq!(ex.answer_text, "42");
        assert_eq!(ex.summary_text, "");
        assert_eq!(ex.class_text, "");
    }

    #[test]
    fn test_unknown_and_missing_key_rejected() {
        assert!(serde_json::from_str::<Exercise>(r#"{"unique_name": "a", "bytecode": ""}"#).is_err());
        assert!(serde_json::from_str::<Exercise>(r#"{"problem_text": "p"}"#).is_err());
    }

    #[test]
    fn test_stored_flattens_id() {
        let stored = StoredExercise {
            problem_id: 7,
            exercise: Exercise::new("ex7").with_problem("p"),
        };
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["problem_id"], 7);
        assert_eq!(value["unique_name"], "ex7");
        assert_eq!(value["problem_text"], "p");
    }

    #[test]
    fn test_display_matches_record_layout() {
        let stored = StoredExercise {
            problem_id: 1,
            exercise: Exercise::new("keyone").with_problem("problem1"),
        };
        assert_eq!(stored.to_string(), "Record 001: keyone\n\nproblem1\n");
    }
}

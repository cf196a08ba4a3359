use tabled::{settings::Style, Table, Tabled};

use crate::exercise::StoredExercise;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
pub struct ExerciseRow {
    #[tabled(rename = "Id")]
    pub problem_id: i64,
    #[tabled(rename = "Name")]
    pub unique_name: String,
    #[tabled(rename = "Title")]
    pub suggestive_name: String,
    #[tabled(rename = "Sections")]
    pub sections_text: String,
}

impl From<&StoredExercise> for ExerciseRow {
    fn from(stored: &StoredExercise) -> Self {
        Self {
            problem_id: stored.problem_id,
            unique_name: stored.exercise.unique_name.clone(),
            suggestive_name: stored.exercise.suggestive_name.clone(),
            sections_text: stored.exercise.sections_text.clone(),
        }
    }
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

pub fn exercise_table(exercises: &[StoredExercise]) -> String {
    if exercises.is_empty() {
        return String::new();
    }
    let rows: Vec<ExerciseRow> = exercises.iter().map(ExerciseRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

//! Lazy traversal over stored exercises
//!
//! The ordered list of matching `problem_id`s is captured when the iterator
//! is created. Rows are then loaded a page of ids at a time, so no statement
//! stays open between calls to `next`. Exercises inserted afterwards are not
//! visited, renamed ones keep their original position, and deleted ones are
//! skipped.

use std::collections::{HashMap, VecDeque};
use std::iter::FusedIterator;

use rusqlite::params_from_iter;

use super::schema::{self, EXERCISE_COLUMNS};
use super::sqlite::{row_to_exercise, ExerciseStore};
use crate::exercise::StoredExercise;
use crate::{regexp, Result};

/// Single-pass iterator over all exercises, or those matching a pattern,
/// in `unique_name` order. Once it returns `None` (or an error) it stays
/// exhausted; call `ExerciseStore::iter` again to start over.
pub struct ExerciseIter<'a> {
    store: &'a ExerciseStore,
    pending: VecDeque<i64>,
    buffer: VecDeque<StoredExercise>,
    done: bool,
}

impl<'a> ExerciseIter<'a> {
    pub(crate) fn new(store: &'a ExerciseStore, pattern: Option<String>) -> Result<Self> {
        let ids = match &pattern {
            Some(pattern) => {
                regexp::build_pattern(pattern)?;
                let sql = format!(
                    "SELECT problem_id FROM exercises WHERE {} ORDER BY unique_name",
                    schema::match_any_text("?1")
                );
                let mut stmt = store.connection().prepare(&sql)?;
                stmt.query_map([pattern], |row| row.get(0))
                    .and_then(|rows| rows.collect::<rusqlite::Result<VecDeque<i64>>>())
                    .map_err(|e| regexp::classify_query_error(pattern, e))?
            }
            None => {
                let mut stmt = store
                    .connection()
                    .prepare("SELECT problem_id FROM exercises ORDER BY unique_name")?;
                stmt.query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<VecDeque<i64>>>()?
            }
        };

        Ok(Self {
            store,
            pending: ids,
            buffer: VecDeque::new(),
            done: false,
        })
    }

    fn fetch_page(&mut self) -> Result<()> {
        let page_size = self.store.options().page_size.max(1);
        let take = page_size.min(self.pending.len());
        let ids: Vec<i64> = self.pending.drain(..take).collect();
        if self.pending.is_empty() {
            self.done = true;
        }
        if ids.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM exercises WHERE problem_id IN ({})",
            EXERCISE_COLUMNS, placeholders
        );
        let mut stmt = self.store.connection().prepare(&sql)?;
        let mut by_id: HashMap<i64, StoredExercise> = stmt
            .query_map(params_from_iter(ids.iter()), row_to_exercise)?
            .map(|r| r.map(|e| (e.problem_id, e)))
            .collect::<rusqlite::Result<_>>()?;

        // Keep the captured order; ids deleted since creation are gone
        self.buffer.extend(ids.iter().filter_map(|id| by_id.remove(id)));
        Ok(())
    }
}

impl Iterator for ExerciseIter<'_> {
    type Item = Result<StoredExercise>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.buffer.is_empty() && !self.done {
            if let Err(e) = self.fetch_page() {
                self.done = true;
                self.pending.clear();
                self.buffer.clear();
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

impl FusedIterator for ExerciseIter<'_> {}

#[cfg(test)]
mod tests {
    use crate::exercise::Exercise;
    use crate::storage::{ExerciseStore, StoreOptions};

    fn small_pages() -> ExerciseStore {
        ExerciseStore::open_in_memory_with(StoreOptions {
            page_size: 2,
            ..StoreOptions::default()
        })
        .unwrap()
    }

    fn collect_names(iter: impl Iterator<Item = crate::Result<crate::StoredExercise>>) -> Vec<String> {
        iter.map(|r| r.unwrap().exercise.unique_name).collect()
    }

    #[test]
    fn test_iter_all_in_order_across_pages() {
        let store = small_pages();
        for name in ["e", "c", "a", "d", "b"] {
            store.create(&Exercise::new(name)).unwrap();
        }

        let names = collect_names(store.iter().unwrap());
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_iter_empty_store() {
        let store = small_pages();
        assert_eq!(store.iter().unwrap().count(), 0);
    }

    #[test]
    fn test_iter_not_restartable() {
        let store = small_pages();
        store.create(&Exercise::new("one")).unwrap();

        let mut iter = store.iter().unwrap();
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        store.create(&Exercise::new("two")).unwrap();
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_iter_excludes_rows_inserted_after_start() {
        let store = small_pages();
        store.create(&Exercise::new("a")).unwrap();
        store.create(&Exercise::new("b")).unwrap();
        store.create(&Exercise::new("c")).unwrap();

        let mut iter = store.iter().unwrap();
        assert_eq!(iter.next().unwrap().unwrap().exercise.unique_name, "a");
        store.create(&Exercise::new("bb")).unwrap();

        let rest: Vec<String> = iter.map(|r| r.unwrap().exercise.unique_name).collect();
        assert_eq!(rest, vec!["b", "c"]);
    }

    #[test]
    fn test_iter_matching_agrees_with_search() {
        let store = small_pages();
        for i in 0..7 {
            let ex = Exercise::new(format!("ex{}", i));
            let ex = if i % 2 == 0 { ex.with_answer("Órbita\nfinal") } else { ex };
            store.create(&ex).unwrap();
        }

        let searched: Vec<String> = store
            .search("^final")
            .unwrap()
            .into_iter()
            .map(|e| e.exercise.unique_name)
            .collect();
        let iterated = collect_names(store.iter_matching("^final").unwrap());
        assert_eq!(iterated, searched);
        assert_eq!(iterated, vec!["ex0", "ex2", "ex4", "ex6"]);
    }

    #[test]
    fn test_iter_rename_during_iteration_yields_once() {
        let store = ExerciseStore::open_in_memory_with(StoreOptions {
            page_size: 1,
            ..StoreOptions::default()
        })
        .unwrap();
        for name in ["a", "b", "c"] {
            store.create(&Exercise::new(name)).unwrap();
        }

        let mut iter = store.iter().unwrap();
        assert_eq!(iter.next().unwrap().unwrap().exercise.unique_name, "a");
        store.rename("a", "z").unwrap();

        let rest = collect_names(iter);
        assert_eq!(rest, vec!["b", "c"]);
    }

    #[test]
    fn test_iter_skips_rows_deleted_during_iteration() {
        let store = small_pages();
        for name in ["a", "b", "c", "d"] {
            store.create(&Exercise::new(name)).unwrap();
        }

        let mut iter = store.iter().unwrap();
        assert_eq!(iter.next().unwrap().unwrap().exercise.unique_name, "a");
        store.delete("c").unwrap();
        store.delete("d").unwrap();

        assert_eq!(collect_names(iter), vec!["b"]);
    }

    #[test]
    fn test_iter_matching_bad_pattern() {
        let store = small_pages();
        assert!(matches!(store.iter_matching("[z-a]"), Err(crate::Error::SearchPattern(_))));
    }
}

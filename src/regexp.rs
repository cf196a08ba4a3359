//! Regex predicate for SQL filtering
//!
//! Registers `regexp(pattern, text)` on a connection so that queries can use
//! `column REGEXP ?`. Matching is case-insensitive, multiline (`^`/`$` at line
//! boundaries), dot-matches-newline and Unicode-aware.

use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

use crate::{Error, Result};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Name of the SQL function; SQLite rewrites `X REGEXP Y` to `regexp(Y, X)`.
pub const FUNCTION_NAME: &str = "regexp";

/// Compile a search pattern with the store's matching flags
pub fn build_pattern(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .dot_matches_new_line(true)
        .unicode(true)
        .build()
}

/// Test `text` against `pattern`
pub fn is_match(pattern: &str, text: &str) -> Result<bool> {
    Ok(build_pattern(pattern)?.is_match(text))
}

/// Install the `regexp` scalar function on `conn`.
///
/// The compiled pattern is cached in SQLite's auxiliary data for the
/// statement, so it is built once per query rather than once per row.
/// A NULL text argument never matches.
pub fn register(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        FUNCTION_NAME,
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let regex: Arc<Regex> = ctx.get_or_create_aux(0, |vr| -> std::result::Result<_, BoxError> {
                Ok(build_pattern(vr.as_str()?)?)
            })?;
            let text: Option<String> = ctx.get(1)?;
            Ok(text.is_some_and(|t| regex.is_match(&t)))
        },
    )?;
    Ok(())
}

/// Map a failed REGEXP query to the error the caller should see.
///
/// rusqlite hands closure errors to SQLite as a plain error message, so the
/// `regex::Error` does not survive the round trip. Recompiling the pattern
/// recovers it.
pub(crate) fn classify_query_error(pattern: &str, err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(..) = err {
        if let Err(regex_err) = build_pattern(pattern) {
            return Error::SearchPattern(regex_err);
        }
    }
    Error::Storage(err)
}

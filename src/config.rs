use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::StoreOptions;
use crate::{Error, Result};

/// File name used under the home directory when no path is given
pub const DEFAULT_DB_FILENAME: &str = "meguadb.sqlite";

/// Optional settings read from `localstore.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LocalStoreConfig {
    pub database: Option<String>,
    pub natural_language: Option<String>,
    pub markup_language: Option<String>,
    pub page_size: Option<usize>,
}

impl LocalStoreConfig {
    /// Apply the file's values over the defaults in `options`
    pub fn apply(&self, mut options: StoreOptions) -> StoreOptions {
        if let Some(lang) = &self.natural_language {
            options.natural_language = lang.clone();
        }
        if let Some(markup) = &self.markup_language {
            options.markup_language = markup.clone();
        }
        if let Some(size) = self.page_size {
            options.page_size = size;
        }
        options
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("localstore.toml")
}

/// Resolve the database location against an explicit home directory.
///
/// An explicit path is returned as-is; the store checks it when opening.
pub fn resolve_db_path_in(explicit: Option<&Path>, home: Option<&Path>) -> Result<PathBuf> {
    match (explicit, home) {
        (Some(path), _) => Ok(path.to_path_buf()),
        (None, Some(home)) => Ok(home.join(DEFAULT_DB_FILENAME)),
        (None, None) => Err(Error::HomeNotFound),
    }
}

/// Resolve the database location, defaulting to `$HOME/meguadb.sqlite`
pub fn resolve_db_path(explicit: Option<&Path>) -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from);
    resolve_db_path_in(explicit, home.as_deref())
}

pub fn load_config(path: Option<&Path>) -> Result<Option<LocalStoreConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: LocalStoreConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = resolve_db_path_in(Some(Path::new("/tmp/x.sqlite")), Some(Path::new("/home/u"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/x.sqlite"));
    }

    #[test]
    fn test_default_under_home() {
        let path = resolve_db_path_in(None, Some(Path::new("/home/u"))).unwrap();
        assert_eq!(path, PathBuf::from("/home/u/meguadb.sqlite"));
    }

    #[test]
    fn test_no_home() {
        assert!(matches!(resolve_db_path_in(None, None), Err(Error::HomeNotFound)));
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("localstore.toml");
        assert!(load_config(Some(&path)).unwrap().is_none());

        std::fs::write(&path, "database = \"ex.sqlite\"\nnatural_language = \"en_us\"\npage_size = 8\n").unwrap();
        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.database.as_deref(), Some("ex.sqlite"));

        let options = config.apply(StoreOptions::default());
        assert_eq!(options.natural_language, "en_us");
        assert_eq!(options.markup_language, "latex");
        assert_eq!(options.page_size, 8);
    }

    #[test]
    fn test_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("localstore.toml");
        std::fs::write(&path, "colour = \"blue\"\n").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(Error::Config(_))));
    }
}

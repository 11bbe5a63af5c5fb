use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use directories::BaseDirs;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".loan-desk";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "library.sqlite";
/// Environment variable that points the desk at a different database file.
pub const DB_PATH_ENV: &str = "LOAN_DESK_DB";

/// Runtime settings for the loan desk binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeskConfig {
    /// SQLite file the binary opens.
    pub database_path: PathBuf,
}

impl DeskConfig {
    /// Use `LOAN_DESK_DB` when set and non-empty, otherwise the database in
    /// the user's home directory.
    pub fn from_env() -> Result<Self> {
        Self::resolve(env::var_os(DB_PATH_ENV).map(PathBuf::from))
    }

    fn resolve(override_path: Option<PathBuf>) -> Result<Self> {
        let database_path = match override_path.filter(|path| !path.as_os_str().is_empty()) {
            Some(path) => path,
            None => default_db_path()?,
        };
        Ok(Self { database_path })
    }
}

/// Resolve the absolute path to the SQLite database inside the user's home.
fn default_db_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}

//! Persistence configuration from TOML (`[storage]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw storage configuration from TOML
///
/// When `path` is unset the database lives in the user data directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// SQLite database file
    pub path: Option<PathBuf>,
    /// Keep trials in process memory only
    pub in_memory: bool,
}

impl FileStorageConfig {
    /// Resolved database location, `None` for in-memory storage
    pub fn database_path(&self) -> Option<PathBuf> {
        if self.in_memory {
            return None;
        }
        self.path.clone().or_else(|| {
            dirs::data_dir().map(|d| d.join("the-jury").join("trials.db"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_has_no_path() {
        let config = FileStorageConfig {
            path: Some(PathBuf::from("/tmp/x.db")),
            in_memory: true,
        };
        assert_eq!(config.database_path(), None);
    }

    #[test]
    fn test_explicit_path_wins() {
        let config = FileStorageConfig {
            path: Some(PathBuf::from("/tmp/x.db")),
            in_memory: false,
        };
        assert_eq!(config.database_path(), Some(PathBuf::from("/tmp/x.db")));
    }
}

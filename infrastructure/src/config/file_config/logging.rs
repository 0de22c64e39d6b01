//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for JSONL trial transcripts (disabled when unset)
    pub transcript_dir: Option<PathBuf>,
    /// Directory for daily-rolling diagnostic logs (disabled when unset)
    pub log_dir: Option<PathBuf>,
}

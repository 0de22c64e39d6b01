//! Model provider configuration from TOML (`[model]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw model configuration from TOML
///
/// ```toml
/// [model]
/// base_url = "https://generativelanguage.googleapis.com"
/// model = "gemini-2.5-flash"
/// api_key_env = "GEMINI_API_KEY"
/// request_timeout_secs = 120
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelConfig {
    /// Provider endpoint root
    pub base_url: String,
    /// Model used for personas and the moderator
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
}

impl Default for FileModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl FileModelConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

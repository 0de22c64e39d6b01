//! Infrastructure layer for the-jury
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod gemini;
pub mod logging;
pub mod storage;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileLoggingConfig, FileModelConfig,
    FileOutputConfig, FilePersonaConfig, FileRetryConfig, FileStorageConfig, FileTrialConfig,
};
pub use gemini::{GeminiConfig, GeminiGateway};
pub use logging::JsonlConversationLogger;
pub use storage::{InMemoryTrialRepository, SqliteTrialRepository};

//! Presentation layer for the-jury
//!
//! This crate contains CLI definitions, output formatters,
//! and live progress reporters.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat};
pub use output::console::ConsoleFormatter;
pub use progress::reporter::{
    NoProgress, ProgressReporter, SimpleProgress, SummonProgress, TrialProgress, follow_summons,
    follow_trial,
};
pub use progress::tracker::{SnapshotTracker, loading_summary, thinking_summary};

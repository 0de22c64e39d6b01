//! Output format value object

use serde::{Deserialize, Serialize};

/// How a finished trial is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Every interaction, round by round (default)
    #[default]
    Transcript,
    /// Only the final verdict
    Verdict,
    /// The whole trial as JSON
    Json,
}

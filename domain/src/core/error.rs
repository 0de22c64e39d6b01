//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Trial {0} is already finished")]
    TrialTerminal(String),

    #[error("Round {attempted} precedes current round {current}")]
    RoundRegression { current: u32, attempted: u32 },

    #[error("Trial {0} already has its question")]
    DuplicateQuestion(String),

    #[error("The question must be recorded in round 1, not round {0}")]
    QuestionOutOfRound(u32),

    #[error("Unknown trial status: {0}")]
    UnknownStatus(String),

    #[error("Unknown interaction type: {0}")]
    UnknownInteractionType(String),

    #[error("Unknown persona: {0}")]
    UnknownPersona(String),

    #[error("Malformed follow-up questions: {0}")]
    MalformedFollowUps(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}
